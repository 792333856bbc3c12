//! One browsing session: the published catalog, its details cache and the
//! rebuild that replaces them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogBuilder};
use crate::details::{DetailsCache, FontDetails};
use crate::discovery::{FolderScanner, FontFolder};
use crate::error::BrowseError;
use crate::features::{FeatureFacet, FeatureFacetIndex, FeatureSpec};
use crate::filter::{FilterEngine, FilterOutcome};
use crate::query::{ActiveFeatures, SearchAndFilterOptions};
use crate::reader::FontFileReader;
use crate::settings::SettingsStore;
use crate::user_tags::TagAssignments;

/// What happened to a finished rebuild.
#[derive(Debug, Clone)]
pub enum RebuildOutcome {
    /// The new catalog is now the session's snapshot.
    Published(Arc<Catalog>),
    /// A later rebuild started first; this result was discarded.
    Superseded,
}

/// Owns the catalog snapshot and details cache for one view.
///
/// Readers always get an `Arc<Catalog>` that is never mutated afterwards.
/// [`Session::rebuild`] swaps the snapshot wholesale, last request wins.
pub struct Session {
    store: Arc<dyn SettingsStore>,
    reader: Arc<dyn FontFileReader>,
    extra_folders: Vec<FontFolder>,
    include_system: bool,
    catalog: RwLock<Arc<Catalog>>,
    details: Arc<DetailsCache>,
    generation: AtomicU64,
    facets: FeatureFacetIndex,
}

impl Session {
    /// A session with an empty catalog and the bundled feature table.
    pub fn new(store: Arc<dyn SettingsStore>, reader: Arc<dyn FontFileReader>) -> Result<Self> {
        Ok(Self {
            details: Arc::new(DetailsCache::new(Arc::clone(&reader))),
            store,
            reader,
            extra_folders: Vec::new(),
            include_system: true,
            catalog: RwLock::new(Arc::new(Catalog::default())),
            generation: AtomicU64::new(0),
            facets: FeatureFacetIndex::new(FeatureSpec::builtin()?),
        })
    }

    pub fn include_system_fonts(mut self, yes: bool) -> Self {
        self.include_system = yes;
        self
    }

    /// Folders scanned in addition to the configured ones, never persisted.
    pub fn with_extra_folders<I>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = FontFolder>,
    {
        self.extra_folders.extend(folders);
        self
    }

    pub fn with_feature_spec(mut self, spec: FeatureSpec) -> Self {
        self.facets = FeatureFacetIndex::new(spec);
        self
    }

    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.store
    }

    /// The currently published catalog.
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog.read())
    }

    pub fn details(&self) -> &Arc<DetailsCache> {
        &self.details
    }

    pub fn facet_index(&self) -> &FeatureFacetIndex {
        &self.facets
    }

    /// Scan the configured folders and build a new catalog.
    ///
    /// Fails with [`BrowseError::CatalogUnavailable`] when no folder could be
    /// read or nothing usable was found. A result that finishes after a newer
    /// rebuild has started is dropped. Publishing clears the details cache.
    pub async fn rebuild(&self) -> Result<RebuildOutcome> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut folders = self
            .store
            .get_folders()
            .context("reading configured font folders")?;
        folders.extend(self.extra_folders.iter().cloned());

        let reader = Arc::clone(&self.reader);
        let include_system = self.include_system;
        let built = tokio::task::spawn_blocking(move || {
            build_catalog(reader.as_ref(), folders, include_system)
        })
        .await
        .context("catalog build task failed")??;

        let mut slot = self.catalog.write();
        if self.generation.load(Ordering::SeqCst) != ticket {
            info!(ticket, "discarding superseded catalog rebuild");
            return Ok(RebuildOutcome::Superseded);
        }
        let catalog = Arc::new(built);
        *slot = Arc::clone(&catalog);
        self.details.clear();
        drop(slot);

        info!(
            families = catalog.len(),
            fonts = catalog.font_count(),
            "catalog published"
        );
        Ok(RebuildOutcome::Published(catalog))
    }

    /// Details for one font of the current catalog, loading on demand.
    pub async fn font_details(&self, full_name: &str) -> Option<Arc<FontDetails>> {
        let font = self.catalog().font_by_full_name(full_name)?.clone();
        Some(self.details.get_or_load(&font).await)
    }

    /// Load details for the named fonts concurrently. Unknown names are
    /// ignored; unreadable fonts are cached as unavailable.
    pub async fn preload<'a, I>(&self, full_names: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let catalog = self.catalog();
        let fonts: Vec<_> = full_names
            .into_iter()
            .filter_map(|name| catalog.font_by_full_name(name).cloned())
            .collect();
        debug!(fonts = fonts.len(), "preloading font details");
        self.details.load_all(fonts).await;
    }

    /// Load details for every font of the current catalog.
    pub async fn preload_all(&self) {
        let catalog = self.catalog();
        self.details.load_all(catalog.fonts().cloned()).await;
    }

    /// Run `engine` against the current snapshot and cache.
    pub fn filter(
        &self,
        engine: &mut FilterEngine,
        options: &SearchAndFilterOptions,
        active: &ActiveFeatures,
        tags: &TagAssignments,
    ) -> Arc<FilterOutcome> {
        let catalog = self.catalog();
        engine.apply(&catalog, options, active, tags, self.details.as_ref())
    }

    /// Feature facets for the fonts a filter pass displayed.
    pub fn facets(&self, outcome: &FilterOutcome, secret: bool) -> Vec<FeatureFacet> {
        self.facets
            .facet_entries(&outcome.displayed_font_names, self.details.as_ref(), secret)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("families", &self.catalog.read().len())
            .field("details", &self.details)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}

fn build_catalog(
    reader: &dyn FontFileReader,
    folders: Vec<FontFolder>,
    include_system: bool,
) -> Result<Catalog> {
    let report = FolderScanner::new(folders)
        .include_system_fonts(include_system)
        .scan();
    if report.scanned_folders == 0 {
        return Err(BrowseError::CatalogUnavailable("no font folder could be read".into()).into());
    }

    let catalog = CatalogBuilder::new(reader).build(report.paths);
    if catalog.is_empty() {
        return Err(BrowseError::CatalogUnavailable("no usable fonts were found".into()).into());
    }
    Ok(catalog)
}
