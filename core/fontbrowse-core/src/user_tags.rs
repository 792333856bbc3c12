//! User-assigned tags, keyed by font full name.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::collate::{locale_cmp, sort_locale};

/// Font full name → its tags, each list deduplicated and locale sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagAssignments(BTreeMap<String, Vec<String>>);

impl TagAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, full_name: &str) -> Option<&[String]> {
        self.0.get(full_name).map(Vec::as_slice)
    }

    /// Add `tag` to a font. Blank tags and duplicates are ignored.
    pub fn add(&mut self, full_name: impl Into<String>, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() {
            return false;
        }
        let tags = self.0.entry(full_name.into()).or_default();
        if tags.iter().any(|t| t == tag) {
            return false;
        }
        tags.push(tag.to_string());
        sort_locale(tags);
        true
    }

    pub fn with(mut self, full_name: &str, tags: &[&str]) -> Self {
        for tag in tags {
            self.add(full_name, tag);
        }
        self
    }

    /// Remove `tag` from a font; a font left without tags loses its entry.
    pub fn remove(&mut self, full_name: &str, tag: &str) -> bool {
        let Some(tags) = self.0.get_mut(full_name) else {
            return false;
        };
        let before = tags.len();
        tags.retain(|t| t != tag);
        let removed = tags.len() != before;
        if tags.is_empty() {
            self.0.remove(full_name);
        }
        removed
    }

    /// Every distinct tag in use, locale sorted.
    pub fn all_tags(&self) -> Vec<String> {
        let distinct: BTreeSet<&String> = self.0.values().flatten().collect();
        let mut tags: Vec<String> = distinct.into_iter().cloned().collect();
        tags.sort_by(|a, b| locale_cmp(a, b));
        tags
    }

    /// Existing tags containing `input`, case-insensitively.
    pub fn suggestions(&self, input: &str) -> Vec<String> {
        let needle = input.to_lowercase();
        self.all_tags()
            .into_iter()
            .filter(|tag| needle.is_empty() || tag.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn fonts(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(name, tags)| (name.as_str(), tags.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
