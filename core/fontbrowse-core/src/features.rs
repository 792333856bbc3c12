//! OpenType feature metadata and the feature facet list.

use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::collate::sort_locale;
use crate::details::DetailsLookup;
use crate::tags::numbered_family;

/// Suggestion text the feature registry uses for features that should not be
/// offered to end users.
pub const HIDDEN_FEATURE_MARKER: &str =
    "Control of the feature should not generally be exposed to the user.";

/// Placeholder substituted in the `cvXX` / `ssXX` friendly names.
pub const NUMBER_PLACEHOLDER: &str = "%NUMBER%";

const BUILTIN_FEATURES: &str = include_str!("../resources/features.json");

/// Registry information about one feature tag. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Feature {
    pub friendly_name: Option<String>,
    pub registered_by: Option<String>,
    pub function: Option<String>,
    pub example: Option<String>,
    pub implementation: Option<String>,
    pub interface: Option<String>,
    pub suggestion: Option<String>,
    pub sensitivity: Option<String>,
    pub interaction: Option<String>,
}

impl Feature {
    /// Minimal record for a tag the registry does not know.
    pub fn unknown(tag: &str) -> Self {
        Self {
            friendly_name: Some(tag.to_string()),
            ..Self::default()
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.suggestion
            .as_deref()
            .is_some_and(|s| s.contains(HIDDEN_FEATURE_MARKER))
    }
}

/// Feature tag → registry record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSpec(HashMap<String, Feature>);

impl FeatureSpec {
    /// The registry table bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_FEATURES).context("parsing bundled feature table")
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn with(mut self, tag: impl Into<String>, feature: Feature) -> Self {
        self.0.insert(tag.into(), feature);
        self
    }

    pub fn get(&self, tag: &str) -> Option<&Feature> {
        self.0.get(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Human-readable record for `tag`; never fails.
///
/// `cvNN` and `ssNN` resolve through the generic `cvXX` / `ssXX` entries with
/// the two trailing characters substituted into the friendly name.
pub fn resolve_feature_info(tag: &str, spec: &FeatureSpec) -> Feature {
    if let Some((generic, number)) = numbered_family(tag) {
        if let Some(template) = spec.get(generic) {
            let mut info = template.clone();
            info.friendly_name = info
                .friendly_name
                .map(|name| name.replace(NUMBER_PLACEHOLDER, number));
            return info;
        }
    }

    spec.get(tag)
        .cloned()
        .unwrap_or_else(|| Feature::unknown(tag))
}

/// Whether a feature control for `tag` may be shown.
pub fn is_feature_visible(tag: &str, spec: &FeatureSpec, secret: bool) -> bool {
    secret || !resolve_feature_info(tag, spec).is_hidden()
}

/// Locale-sorted union of the features of every displayed font. Fonts
/// without cached details contribute nothing.
pub fn feature_union<'a, I, D>(displayed: I, details: &D) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
    D: DetailsLookup + ?Sized,
{
    let mut union = BTreeSet::new();
    for name in displayed {
        if let Some(found) = details.peek(name) {
            union.extend(found.features().iter().cloned());
        }
    }
    let mut tags: Vec<String> = union.into_iter().collect();
    sort_locale(&mut tags);
    tags
}

/// One facet entry: a tag and its resolved registry record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFacet {
    pub tag: String,
    pub info: Feature,
}

/// Computes the feature facet list shown next to the results.
#[derive(Debug, Clone)]
pub struct FeatureFacetIndex {
    spec: FeatureSpec,
}

impl FeatureFacetIndex {
    pub fn new(spec: FeatureSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    /// Visible features supported by any displayed font, locale sorted.
    pub fn facets<'a, I, D>(&self, displayed: I, details: &D, secret: bool) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
        D: DetailsLookup + ?Sized,
    {
        feature_union(displayed, details)
            .into_iter()
            .filter(|tag| is_feature_visible(tag, &self.spec, secret))
            .collect()
    }

    /// [`FeatureFacetIndex::facets`] with registry records attached.
    pub fn facet_entries<'a, I, D>(&self, displayed: I, details: &D, secret: bool) -> Vec<FeatureFacet>
    where
        I: IntoIterator<Item = &'a String>,
        D: DetailsLookup + ?Sized,
    {
        self.facets(displayed, details, secret)
            .into_iter()
            .map(|tag| {
                let info = resolve_feature_info(&tag, &self.spec);
                FeatureFacet { tag, info }
            })
            .collect()
    }

    /// Visible features of a single font, in the font's own order.
    pub fn features_for<D>(&self, full_name: &str, details: &D, secret: bool) -> Vec<FeatureFacet>
    where
        D: DetailsLookup + ?Sized,
    {
        let Some(found) = details.peek(full_name) else {
            return Vec::new();
        };
        found
            .features()
            .iter()
            .filter(|tag| is_feature_visible(tag, &self.spec, secret))
            .map(|tag| FeatureFacet {
                tag: tag.clone(),
                info: resolve_feature_info(tag, &self.spec),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::{DetailsSnapshot, FontDetails};
    use crate::reader::RawDetails;

    fn hidden(name: &str) -> Feature {
        Feature {
            friendly_name: Some(name.to_string()),
            suggestion: Some(HIDDEN_FEATURE_MARKER.to_string()),
            ..Feature::default()
        }
    }

    fn shown(name: &str) -> Feature {
        Feature {
            friendly_name: Some(name.to_string()),
            ..Feature::default()
        }
    }

    fn details(features: &[&str]) -> FontDetails {
        FontDetails::from_raw(RawDetails {
            features: features.iter().map(|f| f.to_string()).collect(),
            characters: Vec::new(),
        })
    }

    #[test]
    fn numbered_features_use_templates() {
        let spec = FeatureSpec::default()
            .with("cvXX", shown("Character Variant %NUMBER%"))
            .with("ssXX", shown("Stylistic Set %NUMBER%"));

        let cv = resolve_feature_info("cv07", &spec);
        assert_eq!(cv.friendly_name.as_deref(), Some("Character Variant 07"));
        let ss = resolve_feature_info("ss12", &spec);
        assert_eq!(ss.friendly_name.as_deref(), Some("Stylistic Set 12"));
    }

    #[test]
    fn unknown_tags_fall_back_to_raw_tag() {
        let spec = FeatureSpec::default();
        assert_eq!(
            resolve_feature_info("zzzz", &spec).friendly_name.as_deref(),
            Some("zzzz")
        );
        assert_eq!(
            resolve_feature_info("ss01", &spec).friendly_name.as_deref(),
            Some("ss01")
        );
    }

    #[test]
    fn hidden_template_hides_numbered_tag_until_secret() {
        let spec = FeatureSpec::default().with("ssXX", hidden("Stylistic Set %NUMBER%"));
        let info = resolve_feature_info("ss03", &spec);
        assert!(info.friendly_name.as_deref().unwrap().contains("03"));

        let snapshot = DetailsSnapshot::new().with("A", details(&["ss03", "liga"]));
        let displayed = BTreeSet::from(["A".to_string()]);
        let index = FeatureFacetIndex::new(spec);

        assert_eq!(index.facets(&displayed, &snapshot, false), vec!["liga"]);
        assert_eq!(index.facets(&displayed, &snapshot, true), vec!["liga", "ss03"]);
    }

    #[test]
    fn facets_union_only_displayed_fonts() {
        let snapshot = DetailsSnapshot::new()
            .with("A", details(&["smcp", "liga"]))
            .with("B", details(&["liga", "kern"]))
            .with("C", details(&["dlig"]))
            .with("Broken", FontDetails::unavailable());
        let displayed = BTreeSet::from([
            "A".to_string(),
            "B".to_string(),
            "Broken".to_string(),
            "NotLoaded".to_string(),
        ]);

        assert_eq!(
            feature_union(&displayed, &snapshot),
            vec!["kern", "liga", "smcp"]
        );
    }

    #[test]
    fn builtin_table_parses_and_marks_hidden_features() {
        let spec = FeatureSpec::builtin().expect("builtin table");
        assert!(spec.len() > 20);
        assert!(!is_feature_visible("ccmp", &spec, false));
        assert!(is_feature_visible("ccmp", &spec, true));
        assert!(is_feature_visible("liga", &spec, false));
        assert_eq!(
            resolve_feature_info("cv01", &spec).friendly_name.as_deref(),
            Some("Character Variant 01")
        );
    }

    #[test]
    fn per_font_features_keep_font_order() {
        let spec = FeatureSpec::builtin().expect("builtin table");
        let index = FeatureFacetIndex::new(spec);
        let snapshot = DetailsSnapshot::new().with("A", details(&["smcp", "ccmp", "liga"]));

        let tags: Vec<String> = index
            .features_for("A", &snapshot, false)
            .into_iter()
            .map(|f| f.tag)
            .collect();
        assert_eq!(tags, vec!["smcp", "liga"]);
        assert!(index.features_for("Missing", &snapshot, true).is_empty());
    }
}
