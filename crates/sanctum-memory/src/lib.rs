//! Sanctum Memory - encrypted storage and caching
//!
//! Two storage tiers sit under the application:
//! - a synchronous local key/value store for small state (settings, key
//!   material, cache snapshots)
//! - an asynchronous durable record store holding one encrypted record
//!   per key
//!
//! `EncryptedStore` encrypts every record under the device key and
//! `SmartCache` keeps decrypted values hot in memory in front of it.

pub mod cache;
pub mod compression;
pub mod encrypted;
pub mod entities;
pub mod kv;
pub mod outcome;
pub mod records;
pub mod sqlite;

pub use cache::{CacheConfig, CacheError, CacheStats, SmartCache};
pub use compression::{CompressionError, CompressionWorker};
pub use encrypted::{EncryptedStore, RecordSummary, StoreError};
pub use entities::{Entity, JournalEntry, MoodEntry, Session, SessionMessage, SpeakerRole};
pub use kv::{FileKv, KeyValueStore, KvKeyStore, MemoryKv, StorageError};
pub use outcome::{BulkOutcome, ItemFailure};
pub use records::{EncryptedRecord, MemoryRecordStore, RecordStore};
pub use sqlite::SqliteRecordStore;
