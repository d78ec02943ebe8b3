//! Composition root
//!
//! `Sanctum` builds every storage component from a `SanctumConfig` and owns
//! them for the life of the process. Nothing is global: two instances over
//! different data directories don't share state.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use thiserror::Error;

use sanctum_crypto::{KeyManager, KeyStore, KeyStoreError, KeychainKeyStore};
use sanctum_memory::{
    CacheError, CompressionWorker, EncryptedStore, Entity, FileKv, JournalEntry, KeyValueStore, KvKeyStore,
    MemoryKv, MemoryRecordStore, MoodEntry, RecordStore, Session, SmartCache, SqliteRecordStore, StorageError,
    StoreError,
};

use crate::audit::AuditAction;
use crate::config::{KeyBackend, SanctumConfig, StoreBackend};
use crate::privacy::{PrivacyError, PrivacyManager};

#[derive(Error, Debug)]
pub enum SanctumError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Key store error: {0}")]
    KeyStore(#[from] KeyStoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Privacy(#[from] PrivacyError),
}

pub struct Sanctum {
    config: SanctumConfig,
    kv: Arc<dyn KeyValueStore>,
    keys: Arc<KeyManager>,
    store: Arc<EncryptedStore>,
    cache: Arc<SmartCache>,
    privacy: PrivacyManager,
}

/// "mood_<id>" -> "mood"
fn data_type(key: &str) -> &str {
    key.split('_').next().unwrap_or(key)
}

impl Sanctum {
    /// Build every component. Must run inside a tokio runtime; the
    /// compression worker is spawned here.
    ///
    /// No key is loaded yet, call `init` before reading or writing records.
    pub fn open(config: SanctumConfig) -> Result<Self, SanctumError> {
        let (kv, records): (Arc<dyn KeyValueStore>, Arc<dyn RecordStore>) = match config.store.backend {
            StoreBackend::Memory => (Arc::new(MemoryKv::new()), Arc::new(MemoryRecordStore::default())),
            StoreBackend::Sqlite => {
                std::fs::create_dir_all(&config.data_dir).map_err(StorageError::Io)?;
                (
                    Arc::new(FileKv::open(config.local_store_path())?),
                    Arc::new(SqliteRecordStore::open(config.database_path())?),
                )
            }
        };

        let key_store: Arc<dyn KeyStore> = match config.keys.backend {
            KeyBackend::Local => Arc::new(KvKeyStore::new(kv.clone())),
            KeyBackend::Keychain => Arc::new(KeychainKeyStore::new(&config.keys.service)),
        };
        let keys = Arc::new(KeyManager::new(key_store));
        let store = Arc::new(EncryptedStore::new(records, keys.clone()));

        let mut cache = SmartCache::new(config.cache.to_cache_config());
        if config.cache.compression {
            cache = cache.with_compressor(Arc::new(CompressionWorker::spawn()));
        }
        if config.cache.persist {
            cache = cache.with_persistence(kv.clone());
        }
        let cache = Arc::new(cache);

        let mut privacy = PrivacyManager::new(kv.clone(), store.clone())?.with_erasable(cache.clone());
        if config.store.backend == StoreBackend::Sqlite {
            let live = config
                .database_path()
                .file_name()
                .map(|name| vec![name.to_string_lossy().into_owned()])
                .unwrap_or_default();
            privacy = privacy.with_database_files(&config.data_dir, &config.store.database_prefix, live);
        }

        tracing::debug!(
            backend = ?config.store.backend,
            keys = ?config.keys.backend,
            data_dir = %config.data_dir.display(),
            "Sanctum opened"
        );

        Ok(Self {
            config,
            kv,
            keys,
            store,
            cache,
            privacy,
        })
    }

    /// Load or create the device key, restore the cache snapshot, start
    /// the cache sweep and apply the retention policy.
    pub async fn init(&self) -> Result<(), SanctumError> {
        self.keys.ensure_key()?;

        match self.cache.restore().await {
            Ok(0) => {}
            Ok(restored) => tracing::info!(restored, "Cache snapshot restored"),
            Err(e) => tracing::warn!(error = %e, "Cache snapshot not restored"),
        }
        self.cache.start_cleanup();

        let retention = self.privacy.enforce_retention().await;
        for failure in retention.failures() {
            tracing::warn!(item = %failure.item, error = %failure.error, "Retention purge failed");
        }
        if let Some(&purged) = retention.value() {
            if purged > 0 {
                tracing::info!(purged, "Retention policy applied");
            }
        }
        Ok(())
    }

    /// Stop background work.
    pub fn destroy(&self) {
        self.cache.destroy();
    }

    pub fn config(&self) -> &SanctumConfig {
        &self.config
    }

    pub fn kv(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    pub fn key_manager(&self) -> &Arc<KeyManager> {
        &self.keys
    }

    pub fn store(&self) -> &Arc<EncryptedStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<SmartCache> {
        &self.cache
    }

    pub fn privacy(&self) -> &PrivacyManager {
        &self.privacy
    }

    /// Cache first, then the encrypted store, back-filling the cache.
    ///
    /// Read failures are logged and treated as "no data".
    pub async fn load_value<T>(&self, key: &str) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
    {
        match self.cache.get::<T>(key).await {
            Ok(Some(value)) => return Some(value),
            Ok(None) => {}
            Err(e) => tracing::debug!(key = %key, error = %e, "Cache read failed, falling back to store"),
        }

        let value = match self.store.get_encrypted::<T>(key).await {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read record");
                return None;
            }
        };

        if let Err(e) = self.cache.set(key, &value, None).await {
            tracing::debug!(key = %key, error = %e, "Could not back-fill cache");
        }
        self.privacy.log_data_access(AuditAction::Read, data_type(key), Some(key.to_string()));
        Some(value)
    }

    /// Write through to the store, then the cache.
    ///
    /// An error means the record was not stored. Once the store write has
    /// succeeded, cache failures are logged and the key is dropped from the
    /// cache.
    pub async fn save_value<T>(&self, key: &str, value: &T) -> Result<(), SanctumError>
    where
        T: Serialize + ?Sized,
    {
        self.store.store_encrypted(key, value).await?;
        self.privacy.log_data_access(AuditAction::Write, data_type(key), Some(key.to_string()));

        if let Err(e) = self.cache.set(key, value, None).await {
            tracing::debug!(key = %key, error = %e, "Could not cache written record");
            // never leave a stale copy behind
            self.cache.delete(key).await;
        }
        Ok(())
    }

    /// Returns whether a record existed.
    pub async fn delete_value(&self, key: &str) -> Result<bool, SanctumError> {
        self.cache.delete(key).await;
        let existed = self.store.delete_encrypted(key).await?;
        if existed {
            self.privacy.log_data_access(AuditAction::Delete, data_type(key), Some(key.to_string()));
        }
        Ok(existed)
    }

    async fn save_entity<T: Entity>(&self, entity: &T) -> Result<(), SanctumError> {
        self.save_value(&entity.record_key(), entity).await
    }

    pub async fn save_session(&self, session: &Session) -> Result<(), SanctumError> {
        self.save_entity(session).await
    }

    pub async fn load_session(&self, id: &str) -> Option<Session> {
        self.load_value(&Session::key_for(id)).await
    }

    pub async fn save_mood(&self, mood: &MoodEntry) -> Result<(), SanctumError> {
        self.save_entity(mood).await
    }

    pub async fn load_mood(&self, id: &str) -> Option<MoodEntry> {
        self.load_value(&MoodEntry::key_for(id)).await
    }

    pub async fn save_journal(&self, entry: &JournalEntry) -> Result<(), SanctumError> {
        self.save_entity(entry).await
    }

    pub async fn load_journal(&self, id: &str) -> Option<JournalEntry> {
        self.load_value(&JournalEntry::key_for(id)).await
    }
}

impl Drop for Sanctum {
    fn drop(&mut self) {
        self.destroy();
    }
}
