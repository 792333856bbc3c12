//! Access to font file internals.
//!
//! The catalog never parses font binaries itself; it goes through
//! [`FontFileReader`]. [`FontationsReader`] is the production implementation
//! and [`MemoryReader`] serves fixed answers for tests and embedders.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Names used to place a font in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontNames {
    pub family_name: Option<String>,
    pub full_name: Option<String>,
    pub subfamily_name: Option<String>,
}

/// Raw extended metadata, before deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDetails {
    pub features: Vec<String>,
    pub characters: Vec<u32>,
}

pub trait FontFileReader: Send + Sync {
    /// Read the naming information of the font at `path`.
    fn open(&self, path: &Path) -> Result<FontNames>;

    /// Read supported OpenType feature tags and code points.
    fn read_details(&self, path: &Path) -> Result<RawDetails>;
}

#[cfg(feature = "fontations")]
pub use fontations::FontationsReader;

#[cfg(feature = "fontations")]
mod fontations {
    use std::fs;
    use std::path::Path;

    use anyhow::{Context, Result};
    use read_fonts::tables::name::NameId;
    use read_fonts::{FontRef, TableProvider};
    use skrifa::{FontRef as SkrifaFontRef, MetadataProvider};

    use super::{FontFileReader, FontNames, RawDetails};
    use crate::error::BrowseError;
    use crate::tags::tag_to_string;

    const WINDOWS_ENGLISH_US: u16 = 0x0409;

    /// Reads TrueType/OpenType files (and the first face of collections)
    /// with read-fonts and skrifa.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct FontationsReader;

    impl FontationsReader {
        pub fn new() -> Self {
            Self
        }
    }

    fn load(path: &Path) -> Result<Vec<u8>> {
        let data = fs::read(path).map_err(|source| BrowseError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(magic) = data.get(..4) {
            if magic == b"wOFF" || magic == b"wOF2" {
                return Err(BrowseError::malformed(path, "compressed web font container").into());
            }
        }
        Ok(data)
    }

    fn parse<'a>(data: &'a [u8], path: &Path) -> Result<FontRef<'a>> {
        FontRef::from_index(data, 0)
            .map_err(|e| BrowseError::malformed(path, e.to_string()).into())
    }

    impl FontFileReader for FontationsReader {
        fn open(&self, path: &Path) -> Result<FontNames> {
            let data = load(path)?;
            let font = parse(&data, path)?;

            let family_name = name_string(&font, &[NameId::TYPOGRAPHIC_FAMILY_NAME, NameId::FAMILY_NAME]);
            let subfamily_name = name_string(
                &font,
                &[NameId::TYPOGRAPHIC_SUBFAMILY_NAME, NameId::SUBFAMILY_NAME],
            );
            let full_name = name_string(&font, &[NameId::FULL_NAME]);

            Ok(FontNames {
                family_name,
                full_name,
                subfamily_name,
            })
        }

        fn read_details(&self, path: &Path) -> Result<RawDetails> {
            let data = load(path)?;
            let font = parse(&data, path)?;
            let sfont = SkrifaFontRef::from_index(&data, 0)
                .with_context(|| format!("reading charmap of {}", path.display()))?;

            Ok(RawDetails {
                features: collect_features(&font),
                characters: sfont.charmap().mappings().map(|(cp, _)| cp).collect(),
            })
        }
    }

    fn collect_features(font: &FontRef) -> Vec<String> {
        let mut tags = Vec::new();
        if let Ok(gsub) = font.gsub() {
            if let Ok(list) = gsub.feature_list() {
                tags.extend(list.feature_records().iter().map(|rec| tag_to_string(rec.feature_tag())));
            }
        }
        if let Ok(gpos) = font.gpos() {
            if let Ok(list) = gpos.feature_list() {
                tags.extend(list.feature_records().iter().map(|rec| tag_to_string(rec.feature_tag())));
            }
        }
        tags
    }

    /// First non-empty Unicode name for the highest-priority id present,
    /// preferring US English records.
    fn name_string(font: &FontRef, ids: &[NameId]) -> Option<String> {
        let name_table = font.name().ok()?;
        let data = name_table.string_data();

        for id in ids {
            let mut fallback = None;
            for record in name_table.name_record() {
                if record.name_id() != *id || !record.is_unicode() {
                    continue;
                }
                let Ok(entry) = record.string(data) else {
                    continue;
                };
                let rendered = entry.to_string().trim().to_string();
                if rendered.is_empty() {
                    continue;
                }
                if record.language_id() == WINDOWS_ENGLISH_US {
                    return Some(rendered);
                }
                fallback.get_or_insert(rendered);
            }
            if fallback.is_some() {
                return fallback;
            }
        }

        None
    }
}

/// One canned answer for [`MemoryReader`].
#[derive(Debug, Clone)]
pub struct MemoryFont {
    pub names: FontNames,
    pub details: Option<RawDetails>,
}

impl MemoryFont {
    pub fn new(family: &str, full: &str, subfamily: &str) -> Self {
        Self {
            names: FontNames {
                family_name: Some(family.to_string()).filter(|s| !s.is_empty()),
                full_name: Some(full.to_string()),
                subfamily_name: Some(subfamily.to_string()),
            },
            details: Some(RawDetails::default()),
        }
    }

    pub fn with_features(mut self, features: &[&str]) -> Self {
        let details = self.details.get_or_insert_with(RawDetails::default);
        details.features = features.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_characters(mut self, text: &str) -> Self {
        let details = self.details.get_or_insert_with(RawDetails::default);
        details.characters = text.chars().map(u32::from).collect();
        self
    }

    /// Names open fine but the detail tables are unreadable.
    pub fn broken_details(mut self) -> Self {
        self.details = None;
        self
    }
}

/// In-memory [`FontFileReader`] keyed by path.
///
/// Paths without an entry fail to open. Reads are counted so callers can
/// assert how often the underlying "file" was touched.
#[derive(Debug, Default)]
pub struct MemoryReader {
    fonts: HashMap<PathBuf, MemoryFont>,
    delay: Option<Duration>,
    opens: AtomicUsize,
    detail_reads: AtomicUsize,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(mut self, path: impl Into<PathBuf>, font: MemoryFont) -> Self {
        self.fonts.insert(path.into(), font);
        self
    }

    /// Block every `read_details` call for `delay`, simulating slow storage.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn detail_read_count(&self) -> usize {
        self.detail_reads.load(Ordering::SeqCst)
    }
}

impl FontFileReader for MemoryReader {
    fn open(&self, path: &Path) -> Result<FontNames> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.fonts
            .get(path)
            .map(|f| f.names.clone())
            .ok_or_else(|| anyhow!("no such font: {}", path.display()))
    }

    fn read_details(&self, path: &Path) -> Result<RawDetails> {
        self.detail_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.fonts
            .get(path)
            .and_then(|f| f.details.clone())
            .ok_or_else(|| anyhow!("unreadable font tables: {}", path.display()))
    }
}
