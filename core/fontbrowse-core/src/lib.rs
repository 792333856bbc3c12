//! fontbrowse-core: font discovery, cataloguing and filtering.
//!
//! The engine behind a font browser. It finds font files on disk, groups
//! them into families, lazily reads what each font supports and narrows the
//! catalog down to what the user asked for.
//!
//! ## Pipeline
//!
//! **Discovery**: [`discovery::FolderScanner`] walks the configured folders
//! plus the platform font folders and returns candidate files (TTF, OTF,
//! WOFF, WOFF2).
//!
//! **Catalog**: [`catalog::CatalogBuilder`] opens every candidate through a
//! [`reader::FontFileReader`] and groups the results into a
//! [`catalog::Catalog`]. Families and styles come out in a fixed order no
//! matter how the filesystem listed them: families by name, `Regular` first
//! inside a family.
//!
//! **Details**: [`details::DetailsCache`] reads feature tags and character
//! coverage on first request, once per font, and shares the result.
//!
//! **Filtering**: [`filter::FilterEngine`] applies a
//! [`query::SearchAndFilterOptions`] (name search, required characters,
//! selected features, user tags) and remembers its last answer.
//! [`features::FeatureFacetIndex`] turns the displayed fonts into the list
//! of feature toggles worth showing.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fontbrowse_core::filter::FilterEngine;
//! use fontbrowse_core::query::{ActiveFeatures, SearchAndFilterOptions};
//! use fontbrowse_core::reader::FontationsReader;
//! use fontbrowse_core::session::Session;
//! use fontbrowse_core::settings::JsonSettingsStore;
//! use fontbrowse_core::user_tags::TagAssignments;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let store = Arc::new(JsonSettingsStore::locate(None)?);
//! let session = Session::new(store, Arc::new(FontationsReader::new()))?;
//! session.rebuild().await?;
//!
//! let options = SearchAndFilterOptions::new().with_search_term("mono");
//! let mut engine = FilterEngine::new();
//! let outcome = session.filter(
//!     &mut engine,
//!     &options,
//!     &ActiveFeatures::new(),
//!     &TagAssignments::new(),
//! );
//! for family in &outcome.families {
//!     println!("{} ({} styles)", family.name, family.fonts.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Long-running work (scanning, parsing) runs on rayon inside
//! `spawn_blocking`; the async surface is tokio.

pub mod catalog;
pub mod collate;
pub mod details;
pub mod discovery;
pub mod error;
pub mod features;
pub mod filter;
pub mod output;
pub mod query;
pub mod reader;
pub mod sample;
pub mod session;
pub mod settings;
pub mod tags;
pub mod user_tags;

pub use catalog::{Catalog, Family, Font};
pub use error::BrowseError;
pub use session::{RebuildOutcome, Session};
