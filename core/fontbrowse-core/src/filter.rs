//! The filter pass over a catalog and its memoizing driver.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::catalog::{Catalog, Family, Font};
use crate::details::DetailsLookup;
use crate::query::{ActiveFeatures, SearchAndFilterOptions};
use crate::user_tags::TagAssignments;

/// The filtered view plus the flattened set of names it shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOutcome {
    /// Surviving families in catalog order; empty families are dropped.
    pub families: Vec<Family>,
    /// Full names of every surviving font.
    pub displayed_font_names: BTreeSet<String>,
}

impl FilterOutcome {
    pub fn font_count(&self) -> usize {
        self.families.iter().map(|f| f.fonts.len()).sum()
    }

    pub fn fonts(&self) -> impl Iterator<Item = &Font> {
        self.families.iter().flat_map(|f| f.fonts.iter())
    }
}

/// Run every predicate against every font of `catalog`.
///
/// Pure in its inputs: the same catalog, options, selection, tags and
/// details contents always give the same outcome. Fonts whose details are
/// not cached yet fail active character filters and count as featureless.
pub fn apply_filters<D>(
    catalog: &Catalog,
    options: &SearchAndFilterOptions,
    active: &ActiveFeatures,
    tags: &TagAssignments,
    details: &D,
) -> FilterOutcome
where
    D: DetailsLookup + ?Sized,
{
    let term = options.lowered_search_term();
    let needs_details = options.characters.as_deref().is_some_and(|c| !c.is_empty())
        || (options.selected_features_only && !active.is_empty());

    let keep = |font: &Font| -> bool {
        if !SearchAndFilterOptions::name_matches(term.as_deref(), font) {
            return false;
        }
        if needs_details {
            let cached = details.peek(&font.full_name);
            if !options.matches_features(cached.as_deref(), active) {
                return false;
            }
            if !options.matches_characters(cached.as_deref()) {
                return false;
            }
        }
        options.matches_tags(tags.get(&font.full_name))
    };

    let mut outcome = FilterOutcome::default();
    for family in catalog.families() {
        let fonts: Vec<Font> = family.fonts.iter().filter(|f| keep(*f)).cloned().collect();
        if fonts.is_empty() {
            continue;
        }
        outcome
            .displayed_font_names
            .extend(fonts.iter().map(|f| f.full_name.clone()));
        outcome.families.push(Family {
            name: family.name.clone(),
            fonts,
        });
    }

    outcome
}

#[derive(Debug, Clone)]
struct MemoKey {
    catalog: Arc<Catalog>,
    options: SearchAndFilterOptions,
    active: ActiveFeatures,
    tags: TagAssignments,
    details_version: u64,
}

impl MemoKey {
    fn same_as(
        &self,
        catalog: &Arc<Catalog>,
        options: &SearchAndFilterOptions,
        active: &ActiveFeatures,
        tags: &TagAssignments,
        details_version: u64,
    ) -> bool {
        Arc::ptr_eq(&self.catalog, catalog)
            && self.details_version == details_version
            && &self.options == options
            && &self.active == active
            && &self.tags == tags
    }
}

/// Re-runs [`apply_filters`] only when an input actually changed.
///
/// The catalog is compared by snapshot identity, the details by their
/// version counter, everything else by value.
#[derive(Debug, Default)]
pub struct FilterEngine {
    last: Option<(MemoKey, Arc<FilterOutcome>)>,
    runs: u64,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply<D>(
        &mut self,
        catalog: &Arc<Catalog>,
        options: &SearchAndFilterOptions,
        active: &ActiveFeatures,
        tags: &TagAssignments,
        details: &D,
    ) -> Arc<FilterOutcome>
    where
        D: DetailsLookup + ?Sized,
    {
        let version = details.version();
        if let Some((key, outcome)) = &self.last {
            if key.same_as(catalog, options, active, tags, version) {
                return Arc::clone(outcome);
            }
        }

        let outcome = Arc::new(apply_filters(catalog, options, active, tags, details));
        self.runs += 1;
        trace!(
            families = outcome.families.len(),
            fonts = outcome.font_count(),
            "filter pass"
        );
        self.last = Some((
            MemoKey {
                catalog: Arc::clone(catalog),
                options: options.clone(),
                active: active.clone(),
                tags: tags.clone(),
                details_version: version,
            },
            Arc::clone(&outcome),
        ));
        outcome
    }

    /// Number of filter passes actually executed.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub fn invalidate(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::{DetailsSnapshot, FontDetails};
    use crate::query::FeatureState;
    use crate::reader::RawDetails;

    fn catalog() -> Catalog {
        Catalog::from_fonts(vec![
            ("Arial".to_string(), Font::new("a.ttf", "Arial Bold", "Bold")),
            ("Arial".to_string(), Font::new("b.ttf", "Arial", "Regular")),
            ("Courier".to_string(), Font::new("c.ttf", "Courier", "Regular")),
        ])
    }

    fn details(features: &[&str], text: &str) -> FontDetails {
        FontDetails::from_raw(RawDetails {
            features: features.iter().map(|f| f.to_string()).collect(),
            characters: text.chars().map(u32::from).collect(),
        })
    }

    #[test]
    fn search_term_keeps_grouping() {
        let outcome = apply_filters(
            &catalog(),
            &SearchAndFilterOptions::new().with_search_term("bold"),
            &ActiveFeatures::new(),
            &TagAssignments::new(),
            &DetailsSnapshot::new(),
        );

        assert_eq!(outcome.families.len(), 1);
        assert_eq!(outcome.families[0].name, "Arial");
        assert_eq!(outcome.families[0].fonts.len(), 1);
        assert_eq!(
            outcome.displayed_font_names,
            BTreeSet::from(["Arial Bold".to_string()])
        );
    }

    #[test]
    fn empty_query_shows_everything_in_order() {
        let cat = catalog();
        let outcome = apply_filters(
            &cat,
            &SearchAndFilterOptions::new(),
            &ActiveFeatures::new(),
            &TagAssignments::new(),
            &DetailsSnapshot::new(),
        );
        assert_eq!(outcome.families, cat.families());
        assert_eq!(outcome.displayed_font_names.len(), 3);
    }

    #[test]
    fn character_filter_hides_unloaded_fonts() {
        let snapshot = DetailsSnapshot::new().with("Courier", details(&[], "é"));
        let outcome = apply_filters(
            &catalog(),
            &SearchAndFilterOptions::new().with_characters("é"),
            &ActiveFeatures::new(),
            &TagAssignments::new(),
            &snapshot,
        );
        let names: Vec<&str> = outcome.fonts().map(|f| f.full_name.as_str()).collect();
        assert_eq!(names, vec!["Courier"]);
    }

    #[test]
    fn feature_filter_uses_selection_membership() {
        let snapshot = DetailsSnapshot::new()
            .with("Arial", details(&["liga", "smcp"], ""))
            .with("Arial Bold", details(&["liga"], ""));
        let active = ActiveFeatures::new().with("smcp", FeatureState::Off);
        let outcome = apply_filters(
            &catalog(),
            &SearchAndFilterOptions::new().selected_features_only(true),
            &active,
            &TagAssignments::new(),
            &snapshot,
        );
        let names: Vec<&str> = outcome.fonts().map(|f| f.full_name.as_str()).collect();
        assert_eq!(names, vec!["Arial"]);
    }

    #[test]
    fn tag_filters_combine() {
        let tags = TagAssignments::new()
            .with("Arial", &["display"])
            .with("Courier", &["display", "mono"]);
        let outcome = apply_filters(
            &catalog(),
            &SearchAndFilterOptions::new()
                .with_included_tags(["display"])
                .with_excluded_tags(["mono"]),
            &ActiveFeatures::new(),
            &tags,
            &DetailsSnapshot::new(),
        );
        let names: Vec<&str> = outcome.fonts().map(|f| f.full_name.as_str()).collect();
        assert_eq!(names, vec!["Arial"]);
    }

    #[test]
    fn engine_memoizes_until_an_input_changes() {
        let cat = Arc::new(catalog());
        let mut engine = FilterEngine::new();
        let opts = SearchAndFilterOptions::new().with_search_term("a");
        let active = ActiveFeatures::new();
        let tags = TagAssignments::new();
        let snapshot = DetailsSnapshot::new();

        let first = engine.apply(&cat, &opts, &active, &tags, &snapshot);
        let second = engine.apply(&cat, &opts, &active, &tags, &snapshot);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.runs(), 1);

        let newer = snapshot.clone().with("Arial", FontDetails::unavailable());
        engine.apply(&cat, &opts, &active, &tags, &newer);
        assert_eq!(engine.runs(), 2);

        let rebuilt = Arc::new(catalog());
        let third = engine.apply(&rebuilt, &opts, &active, &tags, &newer);
        assert_eq!(engine.runs(), 3);
        assert_eq!(*third, *first);

        engine.invalidate();
        engine.apply(&rebuilt, &opts, &active, &tags, &newer);
        assert_eq!(engine.runs(), 4);
    }
}
