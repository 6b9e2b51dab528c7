use std::path::{Path, PathBuf};

use crate::error::ScrapeError;

/// Provider API keys. A missing key leaves that provider out of fetches,
/// except TheAudioDB which falls back to its public key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    pub tmdb: Option<String>,
    pub fanart: Option<String>,
    pub audiodb: Option<String>,
}

/// Where a key's value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    EnvVar(&'static str),
    ConfigFile,
    CommandLine,
    /// Built-in public key.
    Default,
    Missing,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvVar(var) => write!(f, "env ${}", var),
            Self::ConfigFile => write!(f, "config file"),
            Self::CommandLine => write!(f, "command line"),
            Self::Default => write!(f, "default"),
            Self::Missing => write!(f, "not set"),
        }
    }
}

/// Provenance of each key.
#[derive(Debug)]
pub struct KeySources {
    pub tmdb: KeySource,
    pub fanart: KeySource,
    pub audiodb: KeySource,
}

pub const TMDB_ENV: &str = "ARTKEEPER_TMDB_KEY";
pub const FANART_ENV: &str = "ARTKEEPER_FANART_KEY";
pub const AUDIODB_ENV: &str = "ARTKEEPER_AUDIODB_KEY";

/// `[providers]` table of the config file.
#[derive(Debug, Default, serde::Deserialize, serde::Serialize)]
struct ProvidersSection {
    tmdb_api_key: Option<String>,
    fanart_api_key: Option<String>,
    audiodb_api_key: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ConfigFile {
    providers: Option<ProvidersSection>,
}

fn env_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

impl ApiKeys {
    /// Load keys from the default config file and the environment.
    ///
    /// Priority: env vars > config file.
    pub fn load() -> Self {
        Self::load_from(config_path().as_deref())
    }

    /// Same as [`ApiKeys::load`] with an explicit config file.
    pub fn load_from(path: Option<&Path>) -> Self {
        let file = path.and_then(read_providers).unwrap_or_default();
        Self {
            tmdb: env_key(TMDB_ENV).or_else(|| non_empty(&file.tmdb_api_key)),
            fanart: env_key(FANART_ENV).or_else(|| non_empty(&file.fanart_api_key)),
            audiodb: env_key(AUDIODB_ENV).or_else(|| non_empty(&file.audiodb_api_key)),
        }
    }

    /// Apply explicit values (e.g. from CLI args).
    pub fn with_overrides(
        mut self,
        tmdb: Option<String>,
        fanart: Option<String>,
        audiodb: Option<String>,
    ) -> Self {
        if let Some(key) = tmdb {
            self.tmdb = Some(key);
        }
        if let Some(key) = fanart {
            self.fanart = Some(key);
        }
        if let Some(key) = audiodb {
            self.audiodb = Some(key);
        }
        self
    }

    /// Whether any key-gated provider is usable.
    pub fn has_any(&self) -> bool {
        self.tmdb.is_some() || self.fanart.is_some()
    }
}

/// Return the path to the config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("artkeeper").join("config.toml"))
}

fn read_providers(path: &Path) -> Option<ProvidersSection> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<ConfigFile>(&content) {
        Ok(config) => config.providers,
        Err(e) => {
            log::warn!("Ignoring unreadable config {}: {}", path.display(), e);
            None
        }
    }
}

/// Determine where each key is coming from.
pub fn key_sources(path: Option<&Path>) -> KeySources {
    let file = path.and_then(read_providers).unwrap_or_default();
    let source = |var: &'static str, in_file: &Option<String>| {
        if env_key(var).is_some() {
            KeySource::EnvVar(var)
        } else if non_empty(in_file).is_some() {
            KeySource::ConfigFile
        } else {
            KeySource::Missing
        }
    };
    let audiodb = match source(AUDIODB_ENV, &file.audiodb_api_key) {
        KeySource::Missing => KeySource::Default,
        other => other,
    };
    KeySources {
        tmdb: source(TMDB_ENV, &file.tmdb_api_key),
        fanart: source(FANART_ENV, &file.fanart_api_key),
        audiodb,
    }
}

/// Write keys into the `[providers]` table, keeping every other table of
/// the file intact. Returns the path written.
pub fn save_keys(path: &Path, keys: &ApiKeys) -> Result<PathBuf, ScrapeError> {
    let mut doc = match std::fs::read_to_string(path) {
        Ok(content) => content
            .parse::<toml::Table>()
            .map_err(|e| ScrapeError::config(format!("Failed to parse {}: {}", path.display(), e)))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => toml::Table::new(),
        Err(e) => return Err(e.into()),
    };

    let section = ProvidersSection {
        tmdb_api_key: keys.tmdb.clone(),
        fanart_api_key: keys.fanart.clone(),
        audiodb_api_key: keys.audiodb.clone(),
    };
    let value = toml::Value::try_from(section)
        .map_err(|e| ScrapeError::config(format!("Failed to serialize keys: {}", e)))?;
    doc.insert("providers".to_string(), value);

    let text = toml::to_string_pretty(&doc)
        .map_err(|e| ScrapeError::config(format!("Failed to serialize config: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, text)?;
    std::fs::rename(&tmp, path)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_keeps_other_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[artwork]\nlanguage = \"de\"\n").unwrap();

        let keys = ApiKeys {
            tmdb: Some("t-key".into()),
            fanart: None,
            audiodb: None,
        };
        save_keys(&path, &keys).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("language = \"de\""));
        let file: ConfigFile = toml::from_str(&text).unwrap();
        let providers = file.providers.unwrap();
        assert_eq!(providers.tmdb_api_key.as_deref(), Some("t-key"));
        assert!(providers.fanart_api_key.is_none());
    }

    #[test]
    fn overrides_win() {
        let keys = ApiKeys::default().with_overrides(Some("a".into()), None, Some("b".into()));
        assert_eq!(keys.tmdb.as_deref(), Some("a"));
        assert!(keys.fanart.is_none());
        assert_eq!(keys.audiodb.as_deref(), Some("b"));
    }

    #[test]
    fn blank_file_values_are_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[providers]\nfanart_api_key = \"  \"\n").unwrap();
        let sources = key_sources(Some(&path));
        if std::env::var(FANART_ENV).is_err() {
            assert_eq!(sources.fanart, KeySource::Missing);
        }
        if std::env::var(AUDIODB_ENV).is_err() {
            assert_eq!(sources.audiodb, KeySource::Default);
        }
    }
}
