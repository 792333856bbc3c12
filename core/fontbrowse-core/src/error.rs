//! Error taxonomy shared by the catalog, details and session layers.

use std::path::PathBuf;

/// Failures the engine distinguishes between.
///
/// Per-item variants (`FileAccess`, `MalformedFont`) are recovered where they
/// happen: the offending folder or file is logged and left out of the batch.
/// Phase-level variants (`CatalogUnavailable`, `SampleTextUnavailable`) reach
/// the caller wrapped in an [`anyhow::Error`] and are meant to be shown to the
/// user.
#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed font {}: {reason}", path.display())]
    MalformedFont { path: PathBuf, reason: String },

    #[error("font catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("sample text unavailable: {0}")]
    SampleTextUnavailable(String),
}

impl BrowseError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BrowseError::MalformedFont {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for failures that only ever affect one folder or file.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            BrowseError::FileAccess { .. } | BrowseError::MalformedFont { .. }
        )
    }
}
