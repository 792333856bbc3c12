//! Font file discovery over configured and system font folders.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::BrowseError;

/// Environment override for the platform font directory table.
pub const SYSTEM_FONT_DIRS_ENV: &str = "FONTBROWSE_SYSTEM_FONT_DIRS";

/// Extensions the catalog knows how to serve to the rendering layer.
pub const FONT_EXTENSIONS: [&str; 4] = ["ttf", "otf", "woff", "woff2"];

/// A folder to load fonts from, as stored in settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontFolder {
    #[serde(alias = "folderPath")]
    pub path: PathBuf,
    /// Also descend into subfolders.
    #[serde(default, alias = "subfolders")]
    pub recursive: bool,
}

impl FontFolder {
    pub fn new(path: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            path: path.into(),
            recursive,
        }
    }
}

/// Result of one scan: the deduplicated candidate files plus what failed.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Canonical paths of every candidate font file, in path order.
    pub paths: BTreeSet<PathBuf>,
    /// Folders that were scanned without a root-level failure.
    pub scanned_folders: usize,
    /// Folders that could not be read at all.
    pub failures: Vec<BrowseError>,
}

/// Walks configured folders (and optionally the platform font folders) for
/// font files.
#[derive(Debug, Clone)]
pub struct FolderScanner {
    folders: Vec<FontFolder>,
    include_system: bool,
    follow_symlinks: bool,
}

impl FolderScanner {
    pub fn new<I>(folders: I) -> Self
    where
        I: IntoIterator<Item = FontFolder>,
    {
        Self {
            folders: folders.into_iter().collect(),
            include_system: true,
            follow_symlinks: false,
        }
    }

    pub fn include_system_fonts(mut self, yes: bool) -> Self {
        self.include_system = yes;
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Scan every folder, never failing as a whole.
    ///
    /// User folders that cannot be read are recorded in
    /// [`ScanReport::failures`]. Platform folders that do not exist on this
    /// machine are skipped silently.
    pub fn scan(&self) -> ScanReport {
        let mut jobs: Vec<(&FontFolder, bool)> = self.folders.iter().map(|f| (f, false)).collect();
        let system = if self.include_system {
            system_font_dirs()
        } else {
            Vec::new()
        };
        jobs.extend(system.iter().map(|f| (f, true)));

        let results: Vec<(bool, Result<Vec<PathBuf>, BrowseError>)> = jobs
            .par_iter()
            .map(|(folder, is_system)| (*is_system, scan_folder(folder, self.follow_symlinks)))
            .collect();

        let mut report = ScanReport::default();
        for (is_system, result) in results {
            match result {
                Ok(files) => {
                    report.scanned_folders += 1;
                    report.paths.extend(files.into_iter().map(canonical));
                }
                Err(BrowseError::FileAccess { path, .. }) if is_system => {
                    debug!(path = %path.display(), "system font folder not present");
                }
                Err(err) => {
                    warn!(error = %err, "skipping font folder");
                    report.failures.push(err);
                }
            }
        }

        debug!(
            files = report.paths.len(),
            folders = report.scanned_folders,
            "font folder scan finished"
        );
        report
    }
}

fn scan_folder(folder: &FontFolder, follow_symlinks: bool) -> Result<Vec<PathBuf>, BrowseError> {
    let root = &folder.path;
    let meta = fs::metadata(root).map_err(|source| BrowseError::FileAccess {
        path: root.clone(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(BrowseError::FileAccess {
            path: root.clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
        });
    }
    // Fail the folder early if its listing is unreadable.
    fs::read_dir(root).map_err(|source| BrowseError::FileAccess {
        path: root.clone(),
        source,
    })?;

    let mut walker = WalkDir::new(root).follow_links(follow_symlinks);
    if !folder.recursive {
        walker = walker.max_depth(1);
    }

    let mut found = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && is_font(entry.path()) {
            found.push(entry.into_path());
        }
    }

    Ok(found)
}

fn canonical(path: PathBuf) -> PathBuf {
    fs::canonicalize(&path).unwrap_or(path)
}

/// True when the path carries one of [`FONT_EXTENSIONS`], in any case.
pub fn is_font(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return false,
    };

    FONT_EXTENSIONS.contains(&ext.as_str())
}

/// Platform font folders appended to every scan.
///
/// [`SYSTEM_FONT_DIRS_ENV`] replaces the table when set (`:` or `;`
/// separated, scanned recursively). Unknown platforms contribute nothing.
pub fn system_font_dirs() -> Vec<FontFolder> {
    if let Ok(raw) = env::var(SYSTEM_FONT_DIRS_ENV) {
        let mut overrides: Vec<FontFolder> = raw
            .split([':', ';'])
            .filter(|s| !s.is_empty())
            .map(|s| FontFolder::new(s, true))
            .collect();
        overrides.sort_by(|a, b| a.path.cmp(&b.path));
        overrides.dedup();
        return overrides;
    }

    #[allow(unused_mut)]
    let mut candidates: Vec<FontFolder> = Vec::new();

    #[cfg(target_os = "macos")]
    {
        candidates.push(FontFolder::new("/System/Library/Fonts", true));
        candidates.push(FontFolder::new("/Library/Fonts", false));
        if let Some(home) = env::var_os("HOME") {
            candidates.push(FontFolder::new(PathBuf::from(home).join("Library/Fonts"), false));
        }
    }

    #[cfg(target_os = "linux")]
    {
        candidates.push(FontFolder::new("/usr/share/fonts", true));
        candidates.push(FontFolder::new("/usr/local/share/fonts", true));
        if let Some(home) = env::var_os("HOME") {
            candidates.push(FontFolder::new(
                PathBuf::from(home).join(".local/share/fonts"),
                true,
            ));
        }
    }

    #[cfg(target_os = "windows")]
    {
        let root = env::var_os("SYSTEMROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("C:/Windows"));
        candidates.push(FontFolder::new(root.join("Fonts"), false));
        if let Some(local_appdata) = env::var_os("LOCALAPPDATA") {
            candidates.push(FontFolder::new(
                PathBuf::from(local_appdata).join("Microsoft/Windows/Fonts"),
                false,
            ));
        }
    }

    candidates
}
