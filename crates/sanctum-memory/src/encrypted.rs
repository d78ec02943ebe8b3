//! Encrypted record store
//!
//! Records are always encrypted before they reach the record store.
//! Even if someone gets the database, they get ciphertext.
//!
//! A fresh nonce is drawn for every write and stored next to the
//! ciphertext. There is no index: "all records of type X" is a full scan
//! filtered by key prefix, decrypting each match.

use chrono::{DateTime, Utc};
use sanctum_crypto::{cipher, CipherError, KeyManager, KeyStoreError};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::entities::{Entity, JournalEntry, MoodEntry, Session};
use crate::kv::StorageError;
use crate::outcome::{BulkOutcome, ItemFailure};
use crate::records::{EncryptedRecord, RecordStore};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Encryption unavailable: {0}")]
    EncryptionInit(String),

    #[error("Encryption failed: {0}")]
    Encryption(CipherError),

    #[error("Could not decrypt record {key}: {source}")]
    Decryption {
        key: String,
        #[source]
        source: CipherError,
    },

    #[error("Storage write failed: {0}")]
    StorageWrite(#[source] StorageError),

    #[error("Storage read failed: {0}")]
    StorageRead(#[source] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<KeyStoreError> for StoreError {
    fn from(e: KeyStoreError) -> Self {
        StoreError::EncryptionInit(e.to_string())
    }
}

/// Key and timestamp of a record, readable without the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSummary {
    pub key: String,
    pub timestamp: DateTime<Utc>,
    pub size: usize,
}

pub struct EncryptedStore {
    records: Arc<dyn RecordStore>,
    keys: Arc<KeyManager>,
}

impl EncryptedStore {
    pub fn new(records: Arc<dyn RecordStore>, keys: Arc<KeyManager>) -> Self {
        Self { records, keys }
    }

    pub fn store_name(&self) -> &str {
        self.records.name()
    }

    pub fn key_manager(&self) -> &Arc<KeyManager> {
        &self.keys
    }

    /// Serialize, encrypt under the current key and write, replacing any
    /// previous record under `key`.
    pub async fn store_encrypted<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let device_key = self
            .keys
            .current()
            .ok_or_else(|| StoreError::EncryptionInit("no device key loaded".to_string()))?;

        let plaintext = zeroize::Zeroizing::new(serde_json::to_vec(value)?);
        let (iv, encrypted) = cipher::encrypt(&device_key[..], &plaintext).map_err(StoreError::Encryption)?;

        let record = EncryptedRecord {
            key: key.to_string(),
            encrypted,
            iv: iv.to_vec(),
            timestamp: Utc::now(),
        };

        self.records.put(record).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Failed to write encrypted record");
            StoreError::StorageWrite(e)
        })?;

        tracing::debug!(key = %key, store = self.records.name(), "Stored encrypted record");
        Ok(())
    }

    /// Read and decrypt the record under `key`. Absent records are `None`.
    pub async fn get_encrypted<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let record = match self.records.get(key).await.map_err(StoreError::StorageRead)? {
            Some(record) => record,
            None => return Ok(None),
        };
        self.open_record(&record).map(Some)
    }

    /// Returns whether a record was removed.
    pub async fn delete_encrypted(&self, key: &str) -> Result<bool, StoreError> {
        self.records.delete(key).await.map_err(StoreError::StorageWrite)
    }

    fn open_record<T: DeserializeOwned>(&self, record: &EncryptedRecord) -> Result<T, StoreError> {
        let device_key = self
            .keys
            .current()
            .ok_or_else(|| StoreError::EncryptionInit("no device key loaded".to_string()))?;

        let plaintext = cipher::decrypt(&device_key[..], &record.iv, &record.encrypted).map_err(|source| {
            StoreError::Decryption {
                key: record.key.clone(),
                source,
            }
        })?;

        Ok(serde_json::from_slice(&plaintext)?)
    }

    /// Decrypt every record whose key starts with `prefix`.
    ///
    /// Records that fail to decrypt or parse are reported, not fatal.
    pub async fn get_all_of<T: DeserializeOwned>(&self, prefix: &str) -> BulkOutcome<Vec<T>> {
        let records = match self.records.all().await {
            Ok(records) => records,
            Err(e) => return BulkOutcome::failed(ItemFailure::new(self.records.name(), e)),
        };

        let mut values = Vec::new();
        let mut failures = Vec::new();
        for record in records.iter().filter(|r| r.key.starts_with(prefix)) {
            match self.open_record(record) {
                Ok(value) => values.push(value),
                Err(e) => {
                    tracing::warn!(key = %record.key, error = %e, "Skipping unreadable record");
                    failures.push(ItemFailure::new(record.key.clone(), e));
                }
            }
        }

        BulkOutcome::from_parts(values, failures)
    }

    /// Key, timestamp and ciphertext size of every record, without decrypting.
    pub async fn record_summaries(&self) -> Result<Vec<RecordSummary>, StoreError> {
        let records = self.records.all().await.map_err(StoreError::StorageRead)?;
        Ok(records
            .into_iter()
            .map(|r| RecordSummary {
                size: r.encrypted.len(),
                key: r.key,
                timestamp: r.timestamp,
            })
            .collect())
    }

    /// Delete every record the retention predicate rejects.
    pub async fn purge<F>(&self, retain: F) -> BulkOutcome<usize>
    where
        F: Fn(DateTime<Utc>) -> bool,
    {
        let records = match self.records.all().await {
            Ok(records) => records,
            Err(e) => return BulkOutcome::failed(ItemFailure::new(self.records.name(), e)),
        };

        let mut deleted = 0;
        let mut failures = Vec::new();
        for record in records.into_iter().filter(|r| !retain(r.timestamp)) {
            match self.records.delete(&record.key).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => failures.push(ItemFailure::new(record.key, e)),
            }
        }

        if deleted > 0 {
            tracing::info!(deleted, store = self.records.name(), "Purged expired records");
        }
        BulkOutcome::from_parts(deleted, failures)
    }

    /// Remove every record from the underlying store.
    pub async fn wipe(&self) -> Result<usize, StoreError> {
        self.records.clear().await.map_err(StoreError::StorageWrite)
    }

    pub async fn store_entity<T: Entity>(&self, entity: &T) -> Result<(), StoreError> {
        self.store_encrypted(&entity.record_key(), entity).await
    }

    pub async fn get_entity<T: Entity>(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.get_encrypted(&T::key_for(id)).await
    }

    pub async fn delete_entity<T: Entity>(&self, id: &str) -> Result<bool, StoreError> {
        self.delete_encrypted(&T::key_for(id)).await
    }

    pub async fn get_all<T: Entity>(&self) -> BulkOutcome<Vec<T>> {
        self.get_all_of(T::PREFIX).await
    }

    pub async fn store_session(&self, session: &Session) -> Result<(), StoreError> {
        self.store_entity(session).await
    }

    pub async fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        self.get_entity(id).await
    }

    pub async fn get_all_sessions(&self) -> BulkOutcome<Vec<Session>> {
        self.get_all().await
    }

    pub async fn store_mood(&self, mood: &MoodEntry) -> Result<(), StoreError> {
        self.store_entity(mood).await
    }

    pub async fn get_mood(&self, id: &str) -> Result<Option<MoodEntry>, StoreError> {
        self.get_entity(id).await
    }

    pub async fn get_all_moods(&self) -> BulkOutcome<Vec<MoodEntry>> {
        self.get_all().await
    }

    pub async fn store_journal(&self, entry: &JournalEntry) -> Result<(), StoreError> {
        self.store_entity(entry).await
    }

    pub async fn get_journal(&self, id: &str) -> Result<Option<JournalEntry>, StoreError> {
        self.get_entity(id).await
    }

    pub async fn get_all_journals(&self) -> BulkOutcome<Vec<JournalEntry>> {
        self.get_all().await
    }
}
