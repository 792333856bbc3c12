//! The font catalog: families of font files, grouped and sorted for display.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collate::locale_cmp;
use crate::reader::{FontFileReader, FontNames};

/// Style name that always leads its family.
pub const REGULAR: &str = "Regular";

/// URI scheme the rendering layer resolves back to local files.
pub const FONT_SCHEME: &str = "font://";

/// One physical font file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Font {
    /// Forward-slash path of the file; unique within a catalog.
    pub file: String,
    pub full_name: String,
    pub subfamily_name: String,
}

impl Font {
    pub fn new(
        file: impl Into<String>,
        full_name: impl Into<String>,
        subfamily_name: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            full_name: full_name.into(),
            subfamily_name: subfamily_name.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.file)
    }

    /// `font://<file>`, the address the renderer loads this font from.
    pub fn uri(&self) -> String {
        format!("{FONT_SCHEME}{}", self.file)
    }

    pub fn format(&self) -> Result<FontFormat> {
        FontFormat::from_path(Path::new(&self.file))
    }
}

/// Container format, named the way CSS `format()` hints expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFormat {
    TrueType,
    OpenType,
    Woff,
    Woff2,
}

impl FontFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "ttf" => Ok(FontFormat::TrueType),
            "otf" => Ok(FontFormat::OpenType),
            "woff" => Ok(FontFormat::Woff),
            "woff2" => Ok(FontFormat::Woff2),
            _ => Err(anyhow!("invalid font extension: {}", path.display())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FontFormat::TrueType => "truetype",
            FontFormat::OpenType => "opentype",
            FontFormat::Woff => "woff",
            FontFormat::Woff2 => "woff2",
        }
    }
}

/// Fonts sharing a family name, Regular first, then by style name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub name: String,
    pub fonts: Vec<Font>,
}

/// A font as shown in a list: one entry per distinct full name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFont<'a> {
    /// First file that claimed this full name.
    pub font: &'a Font,
    /// Every file claiming the same full name, in catalog order.
    pub files: Vec<&'a str>,
}

impl Family {
    /// Fonts with duplicate full names collapsed onto their first file.
    pub fn display_fonts(&self) -> Vec<DisplayFont<'_>> {
        let mut shown: Vec<DisplayFont<'_>> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for font in &self.fonts {
            match index.get(font.full_name.as_str()) {
                Some(&i) => shown[i].files.push(&font.file),
                None => {
                    index.insert(&font.full_name, shown.len());
                    shown.push(DisplayFont {
                        font,
                        files: vec![&font.file],
                    });
                }
            }
        }
        shown
    }
}

/// Immutable snapshot of every family found in one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    families: Vec<Family>,
}

impl Catalog {
    /// Group loose fonts into a sorted catalog.
    pub fn from_fonts<I>(fonts: I) -> Self
    where
        I: IntoIterator<Item = (String, Font)>,
    {
        let mut grouped: HashMap<String, Vec<Font>> = HashMap::new();
        for (family, font) in fonts {
            grouped.entry(family).or_default().push(font);
        }

        let mut families: Vec<Family> = grouped
            .into_iter()
            .map(|(name, mut fonts)| {
                sort_styles(&mut fonts);
                Family { name, fonts }
            })
            .collect();
        families.sort_by(|a, b| locale_cmp(&a.name, &b.name));

        Self { families }
    }

    pub fn families(&self) -> &[Family] {
        &self.families
    }

    pub fn fonts(&self) -> impl Iterator<Item = &Font> {
        self.families.iter().flat_map(|f| f.fonts.iter())
    }

    pub fn family(&self, name: &str) -> Option<&Family> {
        self.families.iter().find(|f| f.name == name)
    }

    /// First font (in catalog order) carrying `full_name`.
    pub fn font_by_full_name(&self, full_name: &str) -> Option<&Font> {
        self.fonts().find(|f| f.full_name == full_name)
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn font_count(&self) -> usize {
        self.families.iter().map(|f| f.fonts.len()).sum()
    }
}

/// Order styles by name, then pull every `Regular` to the front keeping the
/// relative order of the rest.
pub fn sort_styles(fonts: &mut Vec<Font>) {
    fonts.sort_by(compare_styles);
    let (mut regular, rest): (Vec<Font>, Vec<Font>) =
        fonts.drain(..).partition(|f| f.subfamily_name == REGULAR);
    regular.extend(rest);
    *fonts = regular;
}

fn compare_styles(a: &Font, b: &Font) -> Ordering {
    locale_cmp(&a.subfamily_name, &b.subfamily_name)
        .then_with(|| locale_cmp(&a.full_name, &b.full_name))
        .then_with(|| a.file.cmp(&b.file))
}

/// Builds catalogs by opening every candidate file through a reader.
pub struct CatalogBuilder<'a> {
    reader: &'a dyn FontFileReader,
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(reader: &'a dyn FontFileReader) -> Self {
        Self { reader }
    }

    /// Open every path and assemble the sorted catalog.
    ///
    /// Files that fail to open are logged and skipped, fonts without a
    /// family name are dropped. Sorting happens once all opens have
    /// finished, so the result does not depend on completion order.
    pub fn build<I>(&self, paths: I) -> Catalog
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().collect();

        let opened: Vec<Option<(String, Font)>> = paths
            .par_iter()
            .map(|path| match self.reader.open(path) {
                Ok(names) => entry_for(path, names),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable font");
                    None
                }
            })
            .collect();

        let catalog = Catalog::from_fonts(opened.into_iter().flatten());
        debug!(
            candidates = paths.len(),
            families = catalog.len(),
            fonts = catalog.font_count(),
            "catalog built"
        );
        catalog
    }
}

fn entry_for(path: &Path, names: FontNames) -> Option<(String, Font)> {
    let family = match names.family_name.map(|n| n.trim().to_string()) {
        Some(name) if !name.is_empty() => name,
        _ => {
            debug!(path = %path.display(), "font has no family name");
            return None;
        }
    };

    let subfamily = names
        .subfamily_name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| REGULAR.to_string());
    let full_name = names
        .full_name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("{family} {subfamily}"));

    let font = Font {
        file: path_string(path),
        full_name,
        subfamily_name: subfamily,
    };
    Some((family, font))
}

/// Forward-slash rendering of a path, as used for [`Font::file`].
pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
