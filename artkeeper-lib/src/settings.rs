//! User settings shared by every frontend.
//!
//! Settings live in the same `config.toml` as the provider keys
//! (`~/.config/artkeeper/config.toml`), under `[artwork]` and `[storage]`.
//! Unknown tables and keys are left untouched when a value is saved.

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::download::ExistingFileMode;
use crate::worker_queue::{MAX_WORKERS, MIN_WORKERS, auto_worker_count};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArtworkSettings {
    /// Preferred artwork language (ISO 639-1), e.g. "en".
    pub language: Option<String>,
    /// Root for downloaded image files.
    pub download_dir: Option<PathBuf>,
    pub existing_files: ExistingFileMode,
    pub max_workers: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub artwork: ArtworkSettings,
    pub storage: StorageSettings,
}

/// Canonical path to the settings file.
pub fn settings_path() -> PathBuf {
    artkeeper_scraper::config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
}

/// Load settings from the default file. A missing or unreadable file
/// yields defaults.
pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> Settings {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return Settings::default();
    };
    match toml::from_str(&contents) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Ignoring unreadable settings {}: {}", path.display(), e);
            Settings::default()
        }
    }
}

/// `~/.local/share/artkeeper/artkeeper.db`
pub fn default_database_path() -> PathBuf {
    let data = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    data.join("artkeeper").join("artkeeper.db")
}

/// Resolve the database path:
///
/// 1. CLI override (if `Some`)
/// 2. `storage.database` in the settings file
/// 3. [`default_database_path`]
pub fn resolve_database_path(cli_override: Option<PathBuf>, settings: &Settings) -> PathBuf {
    cli_override
        .or_else(|| settings.storage.database.clone())
        .unwrap_or_else(default_database_path)
}

/// Worker count for downloads and cache warming.
pub fn resolve_workers(settings: &Settings) -> usize {
    match settings.artwork.max_workers {
        Some(n) => n.clamp(MIN_WORKERS, MAX_WORKERS),
        None => auto_worker_count(),
    }
}

/// Set (or clear, with `None`) `section.key` in the settings file at `path`.
///
/// Uses `toml::Value` for a surgical update so other tables, including
/// `[providers]`, are preserved.
pub fn save_setting(path: &Path, section: &str, key: &str, value: Option<&str>) -> io::Result<()> {
    let mut doc: toml::Value = if let Ok(contents) = std::fs::read_to_string(path) {
        contents
            .parse()
            .unwrap_or_else(|_| toml::Value::Table(Default::default()))
    } else {
        toml::Value::Table(Default::default())
    };

    let table = doc
        .as_table_mut()
        .ok_or_else(|| io::Error::other("config.toml root is not a table"))?;
    let entry = table
        .entry(section)
        .or_insert_with(|| toml::Value::Table(Default::default()));
    let section_table = entry
        .as_table_mut()
        .ok_or_else(|| io::Error::other(format!("[{section}] is not a table")))?;

    match value {
        Some(v) => {
            let parsed = match key {
                "max_workers" => v
                    .parse::<i64>()
                    .map(toml::Value::Integer)
                    .map_err(|_| io::Error::other(format!("'{v}' is not a number")))?,
                _ => toml::Value::String(v.to_string()),
            };
            section_table.insert(key.to_string(), parsed);
        }
        None => {
            section_table.remove(key);
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let serialized = toml::to_string_pretty(&doc).map_err(io::Error::other)?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, &serialized)?;
    std::fs::rename(&tmp, path)?;

    Ok(())
}

/// Load the full settings file as a pretty-printed TOML string for display.
pub fn load_settings_string() -> Option<String> {
    let contents = std::fs::read_to_string(settings_path()).ok()?;
    let doc: toml::Value = contents.parse().ok()?;
    toml::to_string_pretty(&doc).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("nope.toml"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.artwork.existing_files, ExistingFileMode::Skip);
    }

    #[test]
    fn save_preserves_other_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[providers]\ntmdb_api_key = \"abc\"\n").unwrap();

        save_setting(&path, "artwork", "language", Some("de")).unwrap();
        save_setting(&path, "artwork", "existing_files", Some("overwrite")).unwrap();
        save_setting(&path, "artwork", "max_workers", Some("5")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("tmdb_api_key"));
        let settings = load_settings_from(&path);
        assert_eq!(settings.artwork.language.as_deref(), Some("de"));
        assert_eq!(settings.artwork.existing_files, ExistingFileMode::Overwrite);
        assert_eq!(resolve_workers(&settings), 5);

        save_setting(&path, "artwork", "language", None).unwrap();
        assert_eq!(load_settings_from(&path).artwork.language, None);
    }

    #[test]
    fn database_path_priority() {
        let mut settings = Settings::default();
        settings.storage.database = Some(PathBuf::from("/srv/art.db"));
        assert_eq!(
            resolve_database_path(Some(PathBuf::from("/tmp/x.db")), &settings),
            PathBuf::from("/tmp/x.db")
        );
        assert_eq!(
            resolve_database_path(None, &settings),
            PathBuf::from("/srv/art.db")
        );
    }

    #[test]
    fn worker_count_is_clamped() {
        let mut settings = Settings::default();
        settings.artwork.max_workers = Some(64);
        assert_eq!(resolve_workers(&settings), MAX_WORKERS);
        settings.artwork.max_workers = Some(1);
        assert_eq!(resolve_workers(&settings), MIN_WORKERS);
    }
}
