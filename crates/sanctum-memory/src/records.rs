//! Durable record storage
//!
//! A record store only ever sees ciphertext. Records are replaced
//! wholesale on write, never patched in place.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::kv::StorageError;

/// One encrypted value as it sits in durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub key: String,
    pub encrypted: Vec<u8>,
    pub iv: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

/// Asynchronous keyed store for encrypted records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Name used in logs, reports and wipe results.
    fn name(&self) -> &str;

    /// Insert or overwrite the record under `record.key`.
    async fn put(&self, record: EncryptedRecord) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Option<EncryptedRecord>, StorageError>;

    /// Returns whether a record was removed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Every record, ordered by key.
    async fn all(&self) -> Result<Vec<EncryptedRecord>, StorageError>;

    /// Remove every record, returning how many were removed.
    async fn clear(&self) -> Result<usize, StorageError>;
}

/// In-memory record store.
pub struct MemoryRecordStore {
    name: String,
    records: RwLock<BTreeMap<String, EncryptedRecord>>,
}

impl MemoryRecordStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, record: EncryptedRecord) -> Result<(), StorageError> {
        tracing::trace!(key = %record.key, size = record.encrypted.len(), "Storing record in memory");
        self.records.write().await.insert(record.key.clone(), record);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<EncryptedRecord>, StorageError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.records.write().await.remove(key).is_some())
    }

    async fn all(&self) -> Result<Vec<EncryptedRecord>, StorageError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn clear(&self) -> Result<usize, StorageError> {
        let mut records = self.records.write().await;
        let count = records.len();
        records.clear();
        Ok(count)
    }
}
