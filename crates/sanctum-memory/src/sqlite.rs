//! SQLite-backed record store
//!
//! One table, one row per record key. Ciphertext and nonce are stored as
//! blobs; the timestamp is kept in clear as epoch milliseconds so retention
//! sweeps never need the key.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::kv::StorageError;
use crate::records::{EncryptedRecord, RecordStore};

/// SQLite-backed encrypted record store
pub struct SqliteRecordStore {
    name: String,
    path: PathBuf,
    conn: Mutex<Connection>,
}

fn read_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Read(e.to_string())
}

fn write_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Write(e.to_string())
}

fn timestamp_from_millis(ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(3, ms))
}

impl SqliteRecordStore {
    /// Open or create the record database
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path).map_err(write_err)?;

        // WAL keeps readers off the writer's back
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(write_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS records (
                key TEXT PRIMARY KEY,
                encrypted BLOB NOT NULL,
                iv BLOB NOT NULL,
                timestamp INTEGER NOT NULL
            );",
        )
        .map_err(write_err)?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sqlite".to_string());

        Ok(Self {
            name,
            path,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, record: EncryptedRecord) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(write_err)?;
        conn.execute(
            "INSERT INTO records (key, encrypted, iv, timestamp) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                encrypted = excluded.encrypted,
                iv = excluded.iv,
                timestamp = excluded.timestamp",
            params![
                record.key,
                record.encrypted,
                record.iv,
                record.timestamp.timestamp_millis()
            ],
        )
        .map_err(write_err)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<EncryptedRecord>, StorageError> {
        let conn = self.conn.lock().map_err(read_err)?;
        conn.query_row(
            "SELECT key, encrypted, iv, timestamp FROM records WHERE key = ?1",
            params![key],
            |row| {
                Ok(EncryptedRecord {
                    key: row.get(0)?,
                    encrypted: row.get(1)?,
                    iv: row.get(2)?,
                    timestamp: timestamp_from_millis(row.get(3)?)?,
                })
            },
        )
        .optional()
        .map_err(read_err)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let conn = self.conn.lock().map_err(write_err)?;
        let deleted = conn
            .execute("DELETE FROM records WHERE key = ?1", params![key])
            .map_err(write_err)?;
        Ok(deleted > 0)
    }

    async fn all(&self) -> Result<Vec<EncryptedRecord>, StorageError> {
        let conn = self.conn.lock().map_err(read_err)?;
        let mut stmt = conn
            .prepare("SELECT key, encrypted, iv, timestamp FROM records ORDER BY key")
            .map_err(read_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(EncryptedRecord {
                    key: row.get(0)?,
                    encrypted: row.get(1)?,
                    iv: row.get(2)?,
                    timestamp: timestamp_from_millis(row.get(3)?)?,
                })
            })
            .map_err(read_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(read_err)
    }

    async fn clear(&self) -> Result<usize, StorageError> {
        let conn = self.conn.lock().map_err(write_err)?;
        conn.execute("DELETE FROM records", []).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(key: &str, ts: DateTime<Utc>) -> EncryptedRecord {
        EncryptedRecord {
            key: key.to_string(),
            encrypted: vec![7; 40],
            iv: vec![1; 12],
            timestamp: ts,
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let dir = tempdir().unwrap();
        let store = SqliteRecordStore::open(dir.path().join("sanctum_records.db")).unwrap();
        assert_eq!(store.name(), "sanctum_records");

        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        store.put(record("journal_1", ts)).await.unwrap();

        let loaded = store.get("journal_1").await.unwrap().unwrap();
        assert_eq!(loaded, record("journal_1", ts));
        assert!(store.get("journal_2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_row() {
        let dir = tempdir().unwrap();
        let store = SqliteRecordStore::open(dir.path().join("records.db")).unwrap();

        store.put(record("mood_1", Utc::now())).await.unwrap();
        let mut newer = record("mood_1", Utc::now());
        newer.encrypted = vec![3; 8];
        store.put(newer).await.unwrap();

        let all = store.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].encrypted, vec![3; 8]);
    }

    #[tokio::test]
    async fn test_survives_reopen_and_clear() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.db");

        {
            let store = SqliteRecordStore::open(&path).unwrap();
            store.put(record("session_a", Utc::now())).await.unwrap();
            store.put(record("session_b", Utc::now())).await.unwrap();
        }

        let store = SqliteRecordStore::open(&path).unwrap();
        assert_eq!(store.all().await.unwrap().len(), 2);
        assert!(store.delete("session_a").await.unwrap());
        assert_eq!(store.clear().await.unwrap(), 1);
        assert!(store.all().await.unwrap().is_empty());
    }
}
