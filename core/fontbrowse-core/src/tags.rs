//! OpenType tag helpers.
//!
//! Feature tags travel through the catalog as plain strings (they are map
//! keys in the details cache, the active-feature selection and the feature
//! registry). These helpers keep the string form canonical.

use anyhow::{anyhow, Result};
#[cfg(feature = "fontations")]
use read_fonts::types::Tag;

/// Validate a 1-4 character printable ASCII tag and return its canonical
/// four-character form (padded with spaces, as fonts store it).
pub fn tag4(raw: &str) -> Result<String> {
    if raw.is_empty() || raw.len() > 4 {
        return Err(anyhow!("tag must be 1-4 printable ASCII chars: {raw:?}"));
    }

    let mut buf = [b' '; 4];
    for (i, byte) in raw.as_bytes().iter().enumerate() {
        if !(0x20..=0x7E).contains(byte) {
            return Err(anyhow!("tag byte out of range: {raw:?}"));
        }
        buf[i] = *byte;
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Render a font-level tag as the string used throughout the catalog.
#[cfg(feature = "fontations")]
pub fn tag_to_string(tag: Tag) -> String {
    String::from_utf8_lossy(&tag.to_be_bytes()).into_owned()
}

/// Split a numbered feature family tag (`cv01`, `ss12`) into its generic
/// registry key (`cvXX`, `ssXX`) and the two-character suffix.
pub fn numbered_family(tag: &str) -> Option<(&'static str, &str)> {
    let prefix = tag.get(..2)?;
    let suffix = tag.get(2..)?;
    if suffix.chars().count() != 2 {
        return None;
    }
    match prefix {
        "cv" => Some(("cvXX", suffix)),
        "ss" => Some(("ssXX", suffix)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_tags() {
        assert_eq!(tag4("cv1").unwrap(), "cv1 ");
        assert_eq!(tag4("liga").unwrap(), "liga");
    }

    #[test]
    fn rejects_bad_tags() {
        assert!(tag4("").is_err());
        assert!(tag4("ligature").is_err());
        assert!(tag4("li\u{7}a").is_err());
    }

    #[test]
    fn numbered_families() {
        assert_eq!(numbered_family("cv01"), Some(("cvXX", "01")));
        assert_eq!(numbered_family("ss20"), Some(("ssXX", "20")));
        assert_eq!(numbered_family("ss0"), None);
        assert_eq!(numbered_family("ss001"), None);
        assert_eq!(numbered_family("smcp"), None);
        assert_eq!(numbered_family("c"), None);
    }

    #[cfg(feature = "fontations")]
    #[test]
    fn renders_font_tags() {
        assert_eq!(tag_to_string(Tag::new(b"kern")), "kern");
    }
}
