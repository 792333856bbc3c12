//! Lazily loaded per-font details and the cache that holds them.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::catalog::Font;
use crate::reader::{FontFileReader, RawDetails};

/// Features and character coverage of one font, keyed by its full name.
///
/// A font whose tables could not be read keeps a record with every field set
/// to `None`: it stays in the catalog but never satisfies a feature or
/// character filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontDetails {
    pub features: Option<Vec<String>>,
    pub characters: Option<BTreeSet<u32>>,
    pub character_string: Option<String>,
}

impl FontDetails {
    pub fn from_raw(raw: RawDetails) -> Self {
        let mut seen = HashSet::new();
        let features: Vec<String> = raw
            .features
            .into_iter()
            .filter(|tag| seen.insert(tag.clone()))
            .collect();
        let characters: BTreeSet<u32> = raw.characters.into_iter().collect();
        let character_string = character_string(&characters);

        Self {
            features: Some(features),
            characters: Some(characters),
            character_string: Some(character_string),
        }
    }

    /// Record cached for fonts whose details could not be read.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_unavailable(&self) -> bool {
        self.features.is_none() && self.characters.is_none()
    }

    pub fn features(&self) -> &[String] {
        self.features.as_deref().unwrap_or(&[])
    }

    pub fn has_feature(&self, tag: &str) -> bool {
        self.features().iter().any(|f| f == tag)
    }

    pub fn supports(&self, codepoint: u32) -> bool {
        self.characters
            .as_ref()
            .is_some_and(|set| set.contains(&codepoint))
    }

    /// Every code point of `text` is covered.
    pub fn supports_all(&self, text: &str) -> bool {
        text.chars().all(|c| self.supports(u32::from(c)))
    }
}

/// One printable instance of every code point, space separated.
fn character_string(characters: &BTreeSet<u32>) -> String {
    let mut out = String::with_capacity(characters.len() * 2);
    for ch in characters.iter().copied().filter_map(printable) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// C0 controls and DEL map onto the Control Pictures block; surrogates and
/// other non-scalars are dropped.
fn printable(cp: u32) -> Option<char> {
    match cp {
        0x00..=0x1F => char::from_u32(0x2400 + cp),
        0x7F => Some('\u{2421}'),
        _ => char::from_u32(cp),
    }
}

/// Read access to cached details without waiting for loads.
pub trait DetailsLookup {
    fn peek(&self, full_name: &str) -> Option<Arc<FontDetails>>;

    /// Changes whenever the visible contents change.
    fn version(&self) -> u64;
}

/// A frozen copy of the cache contents.
#[derive(Debug, Clone, Default)]
pub struct DetailsSnapshot {
    entries: HashMap<String, Arc<FontDetails>>,
    version: u64,
}

impl DetailsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, full_name: impl Into<String>, details: FontDetails) -> Self {
        self.entries.insert(full_name.into(), Arc::new(details));
        self.version += 1;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DetailsLookup for DetailsSnapshot {
    fn peek(&self, full_name: &str) -> Option<Arc<FontDetails>> {
        self.entries.get(full_name).cloned()
    }

    fn version(&self) -> u64 {
        self.version
    }
}

type Slot = Arc<OnceCell<Arc<FontDetails>>>;

/// Process-wide memo of [`FontDetails`] keyed by full name.
///
/// The first request for a name reads the file; concurrent requests for the
/// same name wait on that read instead of issuing their own. Entries are
/// never overwritten, only dropped wholesale by [`DetailsCache::clear`].
pub struct DetailsCache {
    reader: Arc<dyn FontFileReader>,
    slots: Mutex<HashMap<String, Slot>>,
    version: AtomicU64,
}

impl DetailsCache {
    pub fn new(reader: Arc<dyn FontFileReader>) -> Self {
        Self {
            reader,
            slots: Mutex::new(HashMap::new()),
            version: AtomicU64::new(0),
        }
    }

    /// Details for `font`, reading its file on first request.
    pub async fn get_or_load(&self, font: &Font) -> Arc<FontDetails> {
        let slot = self
            .slots
            .lock()
            .entry(font.full_name.clone())
            .or_default()
            .clone();

        let mut loaded_here = false;
        let details = slot
            .get_or_init(|| {
                loaded_here = true;
                self.load(font)
            })
            .await
            .clone();
        if loaded_here {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
        details
    }

    async fn load(&self, font: &Font) -> Arc<FontDetails> {
        let reader = Arc::clone(&self.reader);
        let path = font.path();
        let read = tokio::task::spawn_blocking(move || reader.read_details(&path)).await;

        let details = match read {
            Ok(Ok(raw)) => FontDetails::from_raw(raw),
            Ok(Err(err)) => {
                warn!(font = %font.full_name, file = %font.file, error = %err, "could not load font details");
                FontDetails::unavailable()
            }
            Err(err) => {
                warn!(font = %font.full_name, error = %err, "details loader task failed");
                FontDetails::unavailable()
            }
        };

        debug!(font = %font.full_name, "font details loaded");
        Arc::new(details)
    }

    /// Load details for many fonts concurrently; failures are cached as
    /// unavailable records, never propagated.
    pub async fn load_all<I>(self: &Arc<Self>, fonts: I)
    where
        I: IntoIterator<Item = Font>,
    {
        let mut tasks = JoinSet::new();
        for font in fonts {
            if self.peek(&font.full_name).is_some() {
                continue;
            }
            let cache = Arc::clone(self);
            tasks.spawn(async move {
                cache.get_or_load(&font).await;
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "details preload task failed");
            }
        }
    }

    /// Drop every entry. In-flight loads finish but do not repopulate.
    pub fn clear(&self) {
        self.slots.lock().clear();
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of completed entries.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> DetailsSnapshot {
        let entries = self
            .slots
            .lock()
            .iter()
            .filter_map(|(name, slot)| slot.get().map(|d| (name.clone(), Arc::clone(d))))
            .collect();
        DetailsSnapshot {
            entries,
            version: self.version(),
        }
    }
}

impl DetailsLookup for DetailsCache {
    fn peek(&self, full_name: &str) -> Option<Arc<FontDetails>> {
        self.slots
            .lock()
            .get(full_name)
            .and_then(|slot| slot.get().cloned())
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for DetailsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailsCache")
            .field("entries", &self.len())
            .field("version", &self.version())
            .finish()
    }
}
