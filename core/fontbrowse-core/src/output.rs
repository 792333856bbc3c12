//! JSON and NDJSON writers for catalog views.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::catalog::{Family, Font};
use crate::details::FontDetails;
use crate::features::FeatureFacet;

/// One output record: a font together with the family it was grouped under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FontRecord<'a> {
    pub family_name: &'a str,
    #[serde(flatten)]
    pub font: &'a Font,
}

/// Flatten families into per-font records, keeping catalog order.
pub fn font_records(families: &[Family]) -> Vec<FontRecord<'_>> {
    families
        .iter()
        .flat_map(|family| {
            family.fonts.iter().map(move |font| FontRecord {
                family_name: &family.name,
                font,
            })
        })
        .collect()
}

/// Write families as a prettified JSON array.
pub fn write_json_pretty(families: &[Family], mut w: impl Write) -> Result<()> {
    let json = serde_json::to_string_pretty(families)?;
    w.write_all(json.as_bytes())?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Write one font record per line (NDJSON).
pub fn write_ndjson(families: &[Family], w: impl Write) -> Result<()> {
    write_ndjson_items(&font_records(families), w)
}

/// Write facet entries as a prettified JSON array.
pub fn write_facets_json(facets: &[FeatureFacet], mut w: impl Write) -> Result<()> {
    let json = serde_json::to_string_pretty(facets)?;
    w.write_all(json.as_bytes())?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Write one font's details, named, as prettified JSON.
pub fn write_details_json(full_name: &str, details: &FontDetails, mut w: impl Write) -> Result<()> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Named<'a> {
        full_name: &'a str,
        #[serde(flatten)]
        details: &'a FontDetails,
    }

    let json = serde_json::to_string_pretty(&Named { full_name, details })?;
    w.write_all(json.as_bytes())?;
    w.write_all(b"\n")?;
    Ok(())
}

fn write_ndjson_items<T: Serialize>(items: &[T], mut w: impl Write) -> Result<()> {
    for item in items {
        let line = serde_json::to_string(item)?;
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
    }
    Ok(())
}
