//! TOML-based vault configuration.
//!
//! Every field has a default, so a missing file or a partial file is valid.
//! Paths are resolved relative to `storage.data_dir`.

use crate::logging::default_log_level;
use crate::notify::{DEFAULT_ALERT_BODY, DEFAULT_ALERT_TITLE};
use crate::store::tiered::FallbackPolicy;
use crate::unlock::LockPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Storage locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for every on-device file. Empty means "decided by host".
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default = "default_db_file_name")]
    pub db_file_name: String,
    #[serde(default = "default_fallback_file_name")]
    pub fallback_file_name: String,
    #[serde(default = "default_asset_dir_name")]
    pub asset_dir_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// Defaults to `<data_dir>/logs` when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Lock policy preselected on the lock screen (`1d|7d|30d|random`).
    #[serde(default = "default_policy")]
    pub default_policy: String,
    /// Read the local fallback tier when the primary returns no records.
    #[serde(default = "default_true")]
    pub read_fallback_on_empty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_body")]
    pub body: String,
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoVaultConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

fn default_db_file_name() -> String {
    "echovault.sqlite3".to_string()
}
fn default_fallback_file_name() -> String {
    "echoes.local.json".to_string()
}
fn default_asset_dir_name() -> String {
    "recordings".to_string()
}
fn default_level() -> String {
    default_log_level().to_string()
}
fn default_policy() -> String {
    LockPolicy::SevenDays.as_str().to_string()
}
fn default_true() -> bool {
    true
}
fn default_title() -> String {
    DEFAULT_ALERT_TITLE.to_string()
}
fn default_body() -> String {
    DEFAULT_ALERT_BODY.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            db_file_name: default_db_file_name(),
            fallback_file_name: default_fallback_file_name(),
            asset_dir_name: default_asset_dir_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_dir: None,
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            default_policy: default_policy(),
            read_fallback_on_empty: true,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: default_title(),
            body: default_body(),
        }
    }
}

/// Configuration loading errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, message: String },
    UnknownPolicy(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "invalid config `{}`: {message}", path.display())
            }
            Self::UnknownPolicy(value) => write!(
                f,
                "unknown lock policy `{value}`; expected 1d|7d|30d|random"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl EchoVaultConfig {
    /// Loads configuration from `path`; a missing file yields defaults.
    ///
    /// # Errors
    /// - `ConfigError::Io` for unreadable files.
    /// - `ConfigError::Parse` for invalid TOML.
    /// - `ConfigError::UnknownPolicy` for an unsupported `vault.default_policy`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config: Self = toml::from_str(&raw).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        config.default_policy()?;
        Ok(config)
    }

    /// Returns a copy rooted at `data_dir`.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.storage.data_dir = data_dir.into();
        self
    }

    pub fn default_policy(&self) -> Result<LockPolicy, ConfigError> {
        LockPolicy::parse(&self.vault.default_policy)
            .ok_or_else(|| ConfigError::UnknownPolicy(self.vault.default_policy.clone()))
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        FallbackPolicy {
            read_on_empty: self.vault.read_fallback_on_empty,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.db_file_name)
    }

    pub fn fallback_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.fallback_file_name)
    }

    pub fn asset_dir(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.asset_dir_name)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.logging
            .log_dir
            .clone()
            .unwrap_or_else(|| self.storage.data_dir.join("logs"))
    }
}
