//! Local key/value storage
//!
//! Small, synchronous, string-valued storage for settings, key material
//! and cache snapshots. `MemoryKv` can be given a byte quota so callers
//! see the same "quota exceeded" failure a browser profile would raise.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sanctum_crypto::{KeyStore, KeyStoreError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("Storage write failed: {0}")]
    Write(String),

    #[error("Storage read failed: {0}")]
    Read(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Synchronous string key/value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Returns whether the key existed.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

fn usage(map: &BTreeMap<String, String>) -> usize {
    map.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// In-process key/value store.
#[derive(Default)]
pub struct MemoryKv {
    data: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit total key + value bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            data: Mutex::new(BTreeMap::new()),
            quota: Some(quota),
        }
    }

    pub fn usage(&self) -> usize {
        usage(&self.data.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let data = self.data.lock().map_err(|e| StorageError::Read(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut data = self.data.lock().map_err(|e| StorageError::Write(e.to_string()))?;
        if let Some(quota) = self.quota {
            let existing = data.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let needed = usage(&data) - existing + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    needed,
                    available: quota,
                });
            }
        }
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut data = self.data.lock().map_err(|e| StorageError::Write(e.to_string()))?;
        Ok(data.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let data = self.data.lock().map_err(|e| StorageError::Read(e.to_string()))?;
        Ok(data.keys().cloned().collect())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut data = self.data.lock().map_err(|e| StorageError::Write(e.to_string()))?;
        data.clear();
        Ok(())
    }
}

/// Key/value store persisted as one JSON file, rewritten on every mutation.
pub struct FileKv {
    path: PathBuf,
    data: Mutex<BTreeMap<String, String>>,
}

impl FileKv {
    /// Open or create the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = if path.exists() {
            let raw = fs::read(&path)?;
            serde_json::from_slice(&raw).map_err(|e| StorageError::Read(e.to_string()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, data: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let raw = serde_json::to_vec(data).map_err(|e| StorageError::Write(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| StorageError::Write(e.to_string()))
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let data = self.data.lock().map_err(|e| StorageError::Read(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut data = self.data.lock().map_err(|e| StorageError::Write(e.to_string()))?;
        let previous = data.insert(key.to_string(), value.to_string());
        if let Err(e) = self.save(&data) {
            // keep memory and disk in step
            match previous {
                Some(v) => data.insert(key.to_string(), v),
                None => data.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut data = self.data.lock().map_err(|e| StorageError::Write(e.to_string()))?;
        let Some(previous) = data.remove(key) else {
            return Ok(false);
        };
        if let Err(e) = self.save(&data) {
            data.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(true)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let data = self.data.lock().map_err(|e| StorageError::Read(e.to_string()))?;
        Ok(data.keys().cloned().collect())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut data = self.data.lock().map_err(|e| StorageError::Write(e.to_string()))?;
        let previous = std::mem::take(&mut *data);
        if let Err(e) = self.save(&data) {
            *data = previous;
            return Err(e);
        }
        Ok(())
    }
}

/// Device key kept as raw bytes (base64) in a local key/value store.
pub struct KvKeyStore {
    kv: Arc<dyn KeyValueStore>,
    slot: String,
}

impl KvKeyStore {
    pub const DEFAULT_SLOT: &'static str = "sanctum_encryption_key";

    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_slot(kv, Self::DEFAULT_SLOT)
    }

    pub fn with_slot(kv: Arc<dyn KeyValueStore>, slot: &str) -> Self {
        Self {
            kv,
            slot: slot.to_string(),
        }
    }
}

impl KeyStore for KvKeyStore {
    fn load(&self) -> Result<Option<Vec<u8>>, KeyStoreError> {
        let encoded = self
            .kv
            .get(&self.slot)
            .map_err(|e| KeyStoreError::Platform(e.to_string()))?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(|e| KeyStoreError::InvalidKey(e.to_string())))
            .transpose()
    }

    fn save(&self, key: &[u8]) -> Result<(), KeyStoreError> {
        self.kv
            .set(&self.slot, &STANDARD.encode(key))
            .map_err(|e| KeyStoreError::Platform(e.to_string()))
    }

    fn delete(&self) -> Result<(), KeyStoreError> {
        self.kv
            .remove(&self.slot)
            .map(|_| ())
            .map_err(|e| KeyStoreError::Platform(e.to_string()))
    }
}
