//! Persisted settings: font folders, user tags and remembered options.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collate::locale_cmp;
use crate::discovery::FontFolder;
use crate::query::SearchAndFilterOptions;
use crate::sample::SampleText;
use crate::user_tags::TagAssignments;

/// Overrides the settings file location.
pub const SETTINGS_PATH_ENV: &str = "FONTBROWSE_SETTINGS";

const APP_DIR: &str = "fontbrowse";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub font_folders: Vec<FontFolder>,
    pub tags: TagAssignments,
    pub search_options: Option<SearchAndFilterOptions>,
    pub sample: Option<SampleText>,
    pub dark_mode: Option<bool>,
}

impl Settings {
    /// Add a folder, replacing an entry with the same path, and keep the list
    /// sorted by path.
    pub fn add_folder(&mut self, folder: FontFolder) {
        self.font_folders.retain(|f| f.path != folder.path);
        self.font_folders.push(folder);
        self.font_folders.sort_by(|a, b| {
            locale_cmp(&a.path.to_string_lossy(), &b.path.to_string_lossy())
        });
    }

    pub fn remove_folder(&mut self, path: &Path) -> bool {
        let before = self.font_folders.len();
        self.font_folders.retain(|f| f.path != path);
        before != self.font_folders.len()
    }
}

/// Where settings live between runs.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Settings>;

    fn save(&self, settings: &Settings) -> Result<()>;

    /// Configured font folders, read at catalog rebuild time.
    fn get_folders(&self) -> Result<Vec<FontFolder>> {
        Ok(self.load()?.font_folders)
    }

    /// Load, edit and save in one step.
    fn update(&self, edit: &mut dyn FnMut(&mut Settings)) -> Result<Settings> {
        let mut settings = self.load()?;
        edit(&mut settings);
        self.save(&settings)?;
        Ok(settings)
    }
}

/// Settings stored as one JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use `explicit` if given, else [`SETTINGS_PATH_ENV`], else the
    /// platform configuration directory.
    pub fn locate(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }
        if let Some(raw) = env::var_os(SETTINGS_PATH_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(raw));
        }
        default_settings_path()
            .map(Self::new)
            .ok_or_else(|| anyhow!("cannot determine a settings location; set {SETTINGS_PATH_ENV}"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn default_settings_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var_os("APPDATA").map(|dir| PathBuf::from(dir).join(APP_DIR).join(SETTINGS_FILE))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let base = env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(base.join(APP_DIR).join(SETTINGS_FILE))
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<Settings> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings file, using defaults");
                return Ok(Settings::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading settings {}", self.path.display()))
            }
        };
        serde_json::from_str(&raw).with_context(|| format!("parsing settings {}", self.path.display()))
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating settings directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(settings)?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)
                .with_context(|| format!("writing settings {}", tmp.display()))?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing settings {}", self.path.display()))?;
        Ok(())
    }
}

/// Settings held in memory only.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    settings: Mutex<Settings>,
}

impl InMemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn load(&self) -> Result<Settings> {
        Ok(self.settings.lock().clone())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        *self.settings.lock() = settings.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_defaults() {
        let tmp = tempdir().expect("tempdir");
        let store = JsonSettingsStore::new(tmp.path().join("nope/settings.json"));
        assert_eq!(store.load().expect("load"), Settings::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempdir().expect("tempdir");
        let store = JsonSettingsStore::new(tmp.path().join("cfg/settings.json"));

        let mut settings = Settings::default();
        settings.add_folder(FontFolder::new("/fonts/b", true));
        settings.tags.add("Arial", "sans");
        settings.dark_mode = Some(true);
        store.save(&settings).expect("save");

        let loaded = store.load().expect("load");
        assert_eq!(loaded, settings);
        assert!(!tmp.path().join("cfg/settings.json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("settings.json");
        fs::write(&path, b"{ not json").expect("write");
        assert!(JsonSettingsStore::new(&path).load().is_err());
    }

    #[test]
    fn folders_stay_sorted_and_unique() {
        let mut settings = Settings::default();
        settings.add_folder(FontFolder::new("/fonts/zeta", false));
        settings.add_folder(FontFolder::new("/fonts/Alpha", false));
        settings.add_folder(FontFolder::new("/fonts/zeta", true));

        let paths: Vec<&Path> = settings.font_folders.iter().map(|f| f.path.as_path()).collect();
        assert_eq!(paths, vec![Path::new("/fonts/Alpha"), Path::new("/fonts/zeta")]);
        assert!(settings.font_folders[1].recursive);

        assert!(settings.remove_folder(Path::new("/fonts/Alpha")));
        assert!(!settings.remove_folder(Path::new("/fonts/Alpha")));
        assert_eq!(settings.font_folders.len(), 1);
    }

    #[test]
    fn accepts_legacy_folder_field_names() {
        let settings: Settings = serde_json::from_str(
            r#"{"fontFolders":[{"folderPath":"/fonts","subfolders":true}],"darkMode":false}"#,
        )
        .expect("parse");
        assert_eq!(settings.font_folders, vec![FontFolder::new("/fonts", true)]);
        assert_eq!(settings.dark_mode, Some(false));
    }

    #[test]
    fn update_persists_edits() {
        let store = InMemorySettingsStore::default();
        store
            .update(&mut |s: &mut Settings| s.add_folder(FontFolder::new("/fonts", false)))
            .expect("update");
        assert_eq!(store.get_folders().expect("folders").len(), 1);
    }
}
