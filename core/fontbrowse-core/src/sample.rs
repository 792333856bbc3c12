//! Preview text shown under each font.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::BrowseError;

/// Shown when the custom text is blank.
pub const CUSTOM_PLACEHOLDER: &str = "Your text here";

const PANGRAMS: &[&str] = &[
    "The quick brown fox jumps over the lazy dog.",
    "Pack my box with five dozen liquor jugs.",
    "Sphinx of black quartz, judge my vow.",
    "How vexingly quick daft zebras jump!",
    "The five boxing wizards jump quickly.",
    "Jackdaws love my big sphinx of quartz.",
    "Waltz, bad nymph, for quick jigs vex.",
    "Glib jocks quiz nymph to vex dwarf.",
    "Quick zephyrs blow, vexing daft Jim.",
    "Two driven jocks help fax my big quiz.",
    "Bright vixens jump; dozy fowl quack.",
    "Mr. Jock, TV quiz PhD, bags few lynx.",
];

const LOREM_IPSUM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis \
nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Duis aute irure \
dolor in reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla pariatur.";

/// Which preview text to render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "sampleType", content = "customText", rename_all = "camelCase")]
pub enum SampleText {
    #[default]
    Pangram,
    LoremIpsum,
    Custom(Option<String>),
}

impl SampleText {
    /// Produce the preview string. `seed` picks among the bundled pangrams.
    pub fn resolve(&self, seed: usize) -> Result<String> {
        match self {
            SampleText::Pangram => pick_pangram(PANGRAMS, seed),
            SampleText::LoremIpsum => Ok(LOREM_IPSUM.to_string()),
            SampleText::Custom(text) => Ok(text
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(CUSTOM_PLACEHOLDER)
                .to_string()),
        }
    }
}

fn pick_pangram(table: &[&str], seed: usize) -> Result<String> {
    if table.is_empty() {
        return Err(BrowseError::SampleTextUnavailable("no pangrams available".into()).into());
    }
    Ok(table[seed % table.len()].to_string())
}
