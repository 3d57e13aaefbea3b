use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::extract::ExtractionRules;
use crate::hash::HashScheme;

pub const CONFIG_FILE_NAME: &str = "pramaan.toml";

pub const ENV_BIND: &str = "PRAMAAN_BIND";
pub const ENV_LEDGER_URL: &str = "PRAMAAN_LEDGER_URL";
pub const ENV_DATABASE: &str = "PRAMAAN_DATABASE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("Invalid config {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PramaanConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub ocr: OcrConfig,
    pub hashing: HashScheme,
    pub backend: BackendConfig,
    pub extraction: ExtractionRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    /// Bunyan-style JSON lines.
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: LogFormat::Pretty, filter: "info".to_string() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrEngineKind {
    /// Requires the `tesseract` feature of `pramaan-ocr`.
    #[default]
    Tesseract,
    /// No engine; every upload extracts to an all-absent record.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub engine: OcrEngineKind,
    pub data_path: Option<String>,
    pub lang: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self { engine: OcrEngineKind::Tesseract, data_path: None, lang: "eng".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Remote ledger verification API.
    Ledger {
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// SQLite registry of issued digests.
    Local {
        #[serde(default)]
        database: Option<PathBuf>,
    },
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local { database: None }
    }
}

impl PramaanConfig {
    /// Load from `path`, or from the per-user config file when `path` is
    /// `None` (falling back to defaults if that file does not exist), then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if !p.exists() => return Err(ConfigError::NotFound(p.to_path_buf())),
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config = toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `PRAMAAN_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(ENV_BIND) {
            if bind.trim().is_empty() {
                return Err(ConfigError::Invalid { key: ENV_BIND, message: "empty".into() });
            }
            self.server.bind = bind;
        }

        let ledger_url = lookup(ENV_LEDGER_URL);
        let database = lookup(ENV_DATABASE);
        match (ledger_url, database) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid {
                    key: ENV_LEDGER_URL,
                    message: format!("cannot be combined with {ENV_DATABASE}"),
                })
            }
            (Some(url), None) => {
                let timeout_secs = match &self.backend {
                    BackendConfig::Ledger { timeout_secs, .. } => *timeout_secs,
                    BackendConfig::Local { .. } => default_timeout_secs(),
                };
                self.backend = BackendConfig::Ledger { url, timeout_secs };
            }
            (None, Some(db)) => {
                self.backend = BackendConfig::Local { database: Some(PathBuf::from(db)) };
            }
            (None, None) => {}
        }
        Ok(())
    }

    /// Registry database path, defaulting into the data directory.
    pub fn database_path(&self) -> PathBuf {
        match &self.backend {
            BackendConfig::Local { database: Some(p) } => p.clone(),
            _ => data_dir().join("registry.db"),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "pramaan", "Pramaan")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join(CONFIG_FILE_NAME))
}

/// Per-user data directory, or `./data` when the platform has none.
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}
