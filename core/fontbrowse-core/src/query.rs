//! Search options, feature selection and the per-font predicates.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::Font;
use crate::details::FontDetails;

/// The active query. Replaced as a whole whenever any field changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchAndFilterOptions {
    /// Case-insensitive substring of the font's full name.
    pub search_term: Option<String>,
    /// Text whose every code point a font must cover.
    pub characters: Option<String>,
    pub included_tags: BTreeSet<String>,
    pub excluded_tags: BTreeSet<String>,
    /// Hide fonts lacking all of the actively selected features.
    pub selected_features_only: bool,
    /// Reveal features that are not meant to be user-adjustable.
    pub secret_open_type_features: bool,
}

impl SearchAndFilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_term(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    pub fn with_characters(mut self, text: impl Into<String>) -> Self {
        self.characters = Some(text.into());
        self
    }

    pub fn with_included_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.included_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_excluded_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn selected_features_only(mut self, yes: bool) -> Self {
        self.selected_features_only = yes;
        self
    }

    pub fn secret_open_type_features(mut self, yes: bool) -> Self {
        self.secret_open_type_features = yes;
        self
    }

    /// Pre-lowered search term, computed once per filter pass.
    pub(crate) fn lowered_search_term(&self) -> Option<String> {
        self.search_term
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    fn active_characters(&self) -> Option<&str> {
        self.characters.as_deref().filter(|c| !c.is_empty())
    }

    /// Name predicate. `term` is the pre-lowered search term.
    pub(crate) fn name_matches(term: Option<&str>, font: &Font) -> bool {
        match term {
            Some(term) => font.full_name.to_lowercase().contains(term),
            None => true,
        }
    }

    pub fn matches_name(&self, font: &Font) -> bool {
        Self::name_matches(self.lowered_search_term().as_deref(), font)
    }

    /// Feature predicate; details not loaded yet count as no features.
    pub fn matches_features(&self, details: Option<&FontDetails>, active: &ActiveFeatures) -> bool {
        if !self.selected_features_only || active.is_empty() {
            return true;
        }
        details.is_some_and(|d| d.features().iter().any(|tag| active.contains(tag)))
    }

    /// Character predicate; details not loaded yet never match.
    pub fn matches_characters(&self, details: Option<&FontDetails>) -> bool {
        match self.active_characters() {
            Some(text) => details.is_some_and(|d| d.supports_all(text)),
            None => true,
        }
    }

    /// Tag predicate over the user tags assigned to one font.
    pub fn matches_tags(&self, tags: Option<&[String]>) -> bool {
        match tags.filter(|t| !t.is_empty()) {
            Some(tags) => {
                let included = self.included_tags.is_empty()
                    || tags.iter().any(|t| self.included_tags.contains(t));
                let excluded = !self.excluded_tags.is_empty()
                    && tags.iter().any(|t| self.excluded_tags.contains(t));
                included && !excluded
            }
            None => self.included_tags.is_empty(),
        }
    }
}

/// Forced state of one OpenType feature. Unset means the font default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureState {
    On,
    Off,
}

impl FeatureState {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureState::On => "on",
            FeatureState::Off => "off",
        }
    }
}

/// Feature tag → forced state; absent tags use the font default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveFeatures(BTreeMap<String, FeatureState>);

impl ActiveFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear (`None`) the forced state of `tag`.
    pub fn set(&mut self, tag: impl Into<String>, state: Option<FeatureState>) {
        let tag = tag.into();
        match state {
            Some(state) => {
                self.0.insert(tag, state);
            }
            None => {
                self.0.remove(&tag);
            }
        }
    }

    pub fn with(mut self, tag: impl Into<String>, state: FeatureState) -> Self {
        self.set(tag, Some(state));
        self
    }

    pub fn get(&self, tag: &str) -> Option<FeatureState> {
        self.0.get(tag).copied()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains_key(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FeatureState)> {
        self.0.iter().map(|(tag, state)| (tag.as_str(), *state))
    }

    /// CSS `font-feature-settings` value, e.g. `'liga' on, 'smcp' off`.
    pub fn feature_settings(&self) -> String {
        self.iter()
            .map(|(tag, state)| format!("'{tag}' {}", state.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Parse `tag`, `tag=on` or `tag=off`; a bare tag means `on`.
pub fn parse_feature_setting(raw: &str) -> Result<(String, FeatureState)> {
    let (tag, state) = match raw.split_once('=') {
        Some((tag, state)) => (tag, state),
        None => (raw, "on"),
    };
    let state = match state.trim().to_ascii_lowercase().as_str() {
        "on" | "1" | "true" => FeatureState::On,
        "off" | "0" | "false" => FeatureState::Off,
        other => return Err(anyhow!("invalid feature state {other:?} for {tag}")),
    };
    Ok((crate::tags::tag4(tag.trim())?, state))
}

/// Parse comma-delimited codepoints and ranges (e.g. `U+0041-U+0044,B`).
pub fn parse_codepoint_list(input: &str) -> Result<Vec<char>> {
    let mut result = Vec::new();
    if input.trim().is_empty() {
        return Ok(result);
    }

    for part in input.split(',') {
        if part.contains('-') && part.chars().count() > 1 {
            let pieces: Vec<&str> = part.split('-').collect();
            if pieces.len() != 2 {
                return Err(anyhow!("invalid range: {part}"));
            }
            let start = parse_codepoint(pieces[0])? as u32;
            let end = parse_codepoint(pieces[1])? as u32;
            let (lo, hi) = if start <= end {
                (start, end)
            } else {
                (end, start)
            };
            result.extend((lo..=hi).filter_map(char::from_u32));
        } else {
            result.push(parse_codepoint(part)?);
        }
    }

    Ok(result)
}

fn parse_codepoint(token: &str) -> Result<char> {
    let mut chars = token.chars();
    if let (Some(only), None) = (chars.next(), chars.next()) {
        return Ok(only);
    }

    let trimmed = token
        .trim()
        .trim_start_matches("U+")
        .trim_start_matches("u+");
    let cp = u32::from_str_radix(trimmed, 16).map_err(|_| anyhow!("invalid codepoint: {token}"))?;
    char::from_u32(cp).ok_or_else(|| anyhow!("invalid Unicode scalar: U+{cp:04X}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::RawDetails;

    fn details(features: &[&str], text: &str) -> FontDetails {
        FontDetails::from_raw(RawDetails {
            features: features.iter().map(|f| f.to_string()).collect(),
            characters: text.chars().map(u32::from).collect(),
        })
    }

    fn tagset(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn name_match_is_case_insensitive_and_empty_is_off() {
        let font = Font::new("a.ttf", "Arial Bold", "Bold");
        assert!(SearchAndFilterOptions::new().with_search_term("BOLD").matches_name(&font));
        assert!(!SearchAndFilterOptions::new().with_search_term("light").matches_name(&font));
        assert!(SearchAndFilterOptions::new().with_search_term("").matches_name(&font));
    }

    #[test]
    fn feature_filter_needs_flag_and_selection() {
        let active = ActiveFeatures::new().with("smcp", FeatureState::Off);
        let d = details(&["liga"], "");
        let opts = SearchAndFilterOptions::new().selected_features_only(true);

        assert!(!opts.matches_features(Some(&d), &active));
        assert!(!opts.matches_features(None, &active));
        assert!(opts.matches_features(Some(&details(&["smcp"], "")), &active));
        assert!(opts.matches_features(Some(&d), &ActiveFeatures::new()));
        assert!(SearchAndFilterOptions::new().matches_features(None, &active));
    }

    #[test]
    fn character_filter_rejects_missing_codepoint() {
        let opts = SearchAndFilterOptions::new().with_characters("é");
        assert!(!opts.matches_characters(Some(&details(&[], "abcde"))));
        assert!(opts.matches_characters(Some(&details(&[], "é"))));
        assert!(!opts.matches_characters(None));
        assert!(!opts.matches_characters(Some(&FontDetails::unavailable())));
        assert!(SearchAndFilterOptions::new().matches_characters(None));
    }

    #[test]
    fn tag_filter_boundaries() {
        let include = SearchAndFilterOptions::new().with_included_tags(["display"]);
        assert!(!include.matches_tags(None));
        assert!(!include.matches_tags(Some(tagset(&[]).as_slice())));
        assert!(include.matches_tags(Some(tagset(&["display", "serif"]).as_slice())));
        assert!(!include.matches_tags(Some(tagset(&["serif"]).as_slice())));

        let none = SearchAndFilterOptions::new();
        assert!(none.matches_tags(None));

        let exclude = SearchAndFilterOptions::new().with_excluded_tags(["ugly"]);
        assert!(exclude.matches_tags(None));
        assert!(!exclude.matches_tags(Some(tagset(&["ugly", "serif"]).as_slice())));
        assert!(exclude.matches_tags(Some(tagset(&["serif"]).as_slice())));
    }

    #[test]
    fn feature_settings_render() {
        let active = ActiveFeatures::new()
            .with("smcp", FeatureState::Off)
            .with("liga", FeatureState::On);
        assert_eq!(active.feature_settings(), "'liga' on, 'smcp' off");

        let mut cleared = active.clone();
        cleared.set("liga", None);
        assert_eq!(cleared.len(), 1);
        assert_eq!(cleared.get("smcp"), Some(FeatureState::Off));
    }

    #[test]
    fn parses_feature_settings() {
        assert_eq!(
            parse_feature_setting("ss01").unwrap(),
            ("ss01".to_string(), FeatureState::On)
        );
        assert_eq!(
            parse_feature_setting("liga=off").unwrap(),
            ("liga".to_string(), FeatureState::Off)
        );
        assert!(parse_feature_setting("liga=maybe").is_err());
        assert!(parse_feature_setting("toolong=on").is_err());
    }

    #[test]
    fn options_round_trip_through_settings_json() {
        let opts = SearchAndFilterOptions::new()
            .with_search_term("mono")
            .secret_open_type_features(true);
        let json = serde_json::to_string(&opts).unwrap();
        assert!(json.contains("\"searchTerm\":\"mono\""));
        assert!(json.contains("\"secretOpenTypeFeatures\":true"));
        let back: SearchAndFilterOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opts);

        let sparse: SearchAndFilterOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(sparse, SearchAndFilterOptions::default());
    }
}
