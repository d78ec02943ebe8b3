//! Configuration loaded from `~/.sanctum/config.toml`
//!
//! Every field has a default, so a missing file or an empty one gives a
//! working local profile. Unknown keys are rejected so typos don't silently
//! fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use sanctum_memory::CacheConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No home directory")]
    NoHomeDir,
}

fn sanctum_home() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sanctum"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SanctumConfig {
    /// Where the record database and local key/value file live
    pub data_dir: PathBuf,
    pub cache: CacheSection,
    pub store: StoreSection,
    pub keys: KeySection,
}

impl Default for SanctumConfig {
    fn default() -> Self {
        Self {
            data_dir: sanctum_home().unwrap_or_else(|| PathBuf::from(".sanctum")),
            cache: CacheSection::default(),
            store: StoreSection::default(),
            keys: KeySection::default(),
        }
    }
}

impl SanctumConfig {
    /// `~/.sanctum/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        sanctum_home()
            .map(|dir| dir.join("config.toml"))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Everything in process memory; nothing touches `data_dir`.
    pub fn in_memory() -> Self {
        Self {
            store: StoreSection {
                backend: StoreBackend::Memory,
                ..StoreSection::default()
            },
            ..Self::default()
        }
    }

    /// Path of the record database for the sqlite backend.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}records.db", self.store.database_prefix))
    }

    /// Path of the local key/value file for the sqlite backend.
    pub fn local_store_path(&self) -> PathBuf {
        self.data_dir.join("local.json")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    pub max_size_bytes: usize,
    pub max_entries: usize,
    pub default_ttl_secs: u64,
    pub cleanup_interval_secs: u64,
    pub compression: bool,
    pub compression_threshold_bytes: usize,
    /// Snapshot the cache to the local key/value store on every write.
    /// Snapshots hold decrypted values, so this is off unless asked for.
    pub persist: bool,
}

impl Default for CacheSection {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            max_size_bytes: defaults.max_size_bytes,
            max_entries: defaults.max_entries,
            default_ttl_secs: defaults.default_ttl.as_secs(),
            cleanup_interval_secs: defaults.cleanup_interval.as_secs(),
            compression: true,
            compression_threshold_bytes: defaults.compression_threshold,
            persist: false,
        }
    }
}

impl CacheSection {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_size_bytes: self.max_size_bytes,
            max_entries: self.max_entries.max(1),
            default_ttl: Duration::from_secs(self.default_ttl_secs),
            cleanup_interval: Duration::from_secs(self.cleanup_interval_secs.max(1)),
            compression_threshold: self.compression_threshold_bytes,
            ..CacheConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    /// Database files in `data_dir` starting with this are ours
    pub database_prefix: String,
    pub backend: StoreBackend,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            database_prefix: "sanctum_".to_string(),
            backend: StoreBackend::Sqlite,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyBackend {
    /// Raw key bytes in the local key/value store
    Local,
    /// OS keychain
    Keychain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeySection {
    pub backend: KeyBackend,
    /// Keychain service name
    pub service: String,
}

impl Default for KeySection {
    fn default() -> Self {
        Self {
            backend: KeyBackend::Local,
            service: "sanctum".to_string(),
        }
    }
}
