//! Smart cache
//!
//! In-memory TTL + LRU cache in front of the encrypted store.
//!
//! - Entries expire when `now - timestamp > ttl`, checked on every read and
//!   by a periodic sweep.
//! - Inserts that would push the total payload size over `max_size_bytes`
//!   evict least recently accessed entries until the new one fits.
//! - Reaching `max_entries` evicts the oldest 10% by last access.
//! - Payloads over the compression threshold go through the compression
//!   worker when one is attached.
//! - With persistence attached, the whole map is snapshotted to the local
//!   key/value store on every write.
//!
//! Sizes are the serialized JSON byte length (compressed length when
//! compressed), not the in-memory footprint of the decoded value.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::compression::{CompressionError, CompressionWorker};
use crate::kv::{KeyValueStore, StorageError};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Compression error: {0}")]
    Compression(#[from] CompressionError),

    #[error("Entry {key} is {size} bytes, larger than the whole cache ({max} bytes)")]
    EntryTooLarge { key: String, size: usize, max: usize },

    #[error("Snapshot persistence failed: {0}")]
    Persistence(#[from] StorageError),
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_size_bytes: usize,
    pub max_entries: usize,
    pub default_ttl: Duration,
    pub cleanup_interval: Duration,
    /// Compress payloads larger than this when a worker is attached
    pub compression_threshold: usize,
    /// Key the snapshot is written under when persistence is attached
    pub snapshot_key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 50 * 1024 * 1024, // 50MB
            max_entries: 1000,
            default_ttl: Duration::from_secs(30 * 60),
            cleanup_interval: Duration::from_secs(60),
            compression_threshold: 1024,
            snapshot_key: "sanctum_cache_snapshot".to_string(),
        }
    }
}

/// One cached payload and its bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(serialize_with = "to_base64", deserialize_with = "from_base64")]
    pub data: Vec<u8>,
    /// Insert time, epoch millis
    pub timestamp: i64,
    /// Time to live, millis
    pub ttl: u64,
    pub access_count: u64,
    /// Last read or write, epoch millis
    pub last_accessed: i64,
    pub size: usize,
    /// Bumped each time the key is overwritten
    pub version: u32,
    pub compressed: bool,
    /// Orders accesses that land in the same millisecond
    #[serde(default)]
    tick: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now: i64) -> bool {
        let age = i128::from(now) - i128::from(self.timestamp);
        age > i128::from(self.ttl)
    }
}

fn to_base64<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&STANDARD.encode(bytes))
}

fn from_base64<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(d)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub entries: usize,
    pub hit_rate: f64,
    /// Mean time spent serving a hit, millis
    pub average_access_time_ms: f64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    size: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
    total_hit_time: Duration,
    tick: u64,
}

impl CacheState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.size -= entry.size;
        Some(entry)
    }

    fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            size: self.size,
            entries: self.entries.len(),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                self.hits as f64 / lookups as f64
            },
            average_access_time_ms: if self.hits == 0 {
                0.0
            } else {
                self.total_hit_time.as_secs_f64() * 1000.0 / self.hits as f64
            },
        }
    }

    /// Keys ordered least recently accessed first.
    fn lru_order(&self) -> Vec<String> {
        let mut order: Vec<(&String, i64, u64)> = self
            .entries
            .iter()
            .map(|(k, e)| (k, e.last_accessed, e.tick))
            .collect();
        order.sort_by_key(|&(_, last, tick)| (last, tick));
        order.into_iter().map(|(k, _, _)| k.clone()).collect()
    }

    /// Evict LRU entries until `incoming` more bytes fit under `max_size`.
    fn evict_for_space(&mut self, incoming: usize, max_size: usize) -> usize {
        let mut evicted = 0;
        for key in self.lru_order() {
            if self.size + incoming <= max_size {
                break;
            }
            self.remove(&key);
            evicted += 1;
        }
        self.evictions += evicted as u64;
        evicted
    }

    /// Evict the least recently accessed tenth of entries, at least one.
    fn evict_oldest_tenth(&mut self) -> usize {
        let count = (self.entries.len() / 10).max(1);
        let mut evicted = 0;
        for key in self.lru_order().into_iter().take(count) {
            if self.remove(&key).is_some() {
                evicted += 1;
            }
        }
        self.evictions += evicted as u64;
        evicted
    }

    fn purge_expired(&mut self, now: i64) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }
}

#[derive(Serialize)]
struct SnapshotOut<'a> {
    version: u32,
    saved_at: i64,
    entries: &'a HashMap<String, CacheEntry>,
}

#[derive(Deserialize)]
struct SnapshotIn {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

pub struct SmartCache {
    config: CacheConfig,
    state: Arc<Mutex<CacheState>>,
    compressor: Option<Arc<CompressionWorker>>,
    persistence: Option<Arc<dyn KeyValueStore>>,
    cleanup: std::sync::Mutex<Option<JoinHandle<()>>>,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl SmartCache {
    pub fn new(mut config: CacheConfig) -> Self {
        config.max_entries = config.max_entries.max(1);
        Self {
            config,
            state: Arc::new(Mutex::new(CacheState::default())),
            compressor: None,
            persistence: None,
            cleanup: std::sync::Mutex::new(None),
        }
    }

    /// Compress large payloads through `worker`.
    pub fn with_compressor(mut self, worker: Arc<CompressionWorker>) -> Self {
        self.compressor = Some(worker);
        self
    }

    /// Snapshot the map to `kv` on every write.
    pub fn with_persistence(mut self, kv: Arc<dyn KeyValueStore>) -> Self {
        self.persistence = Some(kv);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up `key`. Expired entries count as a miss and are dropped.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let started = Instant::now();
        let now = now_millis();

        let (data, compressed) = {
            let mut state = self.state.lock().await;
            let expired = match state.entries.get(key) {
                None => {
                    state.misses += 1;
                    tracing::trace!(key = %key, "Cache miss");
                    return Ok(None);
                }
                Some(entry) => entry.is_expired(now),
            };
            if expired {
                state.remove(key);
                state.misses += 1;
                tracing::trace!(key = %key, "Cache entry expired");
                return Ok(None);
            }

            let tick = state.next_tick();
            let entry = match state.entries.get_mut(key) {
                Some(entry) => entry,
                None => return Ok(None),
            };
            entry.access_count += 1;
            entry.last_accessed = now;
            entry.tick = tick;
            (entry.data.clone(), entry.compressed)
        };

        let decoded = self.decode(data, compressed).await;
        let mut state = self.state.lock().await;
        match decoded {
            Ok(value) => {
                state.hits += 1;
                state.total_hit_time += started.elapsed();
                Ok(Some(value))
            }
            Err(e) => {
                state.misses += 1;
                tracing::warn!(key = %key, error = %e, "Cached entry could not be decoded");
                Err(e)
            }
        }
    }

    async fn decode<T: DeserializeOwned>(&self, data: Vec<u8>, compressed: bool) -> Result<T, CacheError> {
        let raw = if compressed {
            match &self.compressor {
                Some(worker) => worker.decompress(data).await?,
                None => return Err(CacheError::Compression(CompressionError::WorkerGone)),
            }
        } else {
            data
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Insert or replace `key`, with `ttl` or the configured default.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<(), CacheError> {
        let raw = serde_json::to_vec(value)?;
        let (data, compressed) = match &self.compressor {
            Some(worker) if raw.len() > self.config.compression_threshold => {
                (worker.compress(raw).await?, true)
            }
            _ => (raw, false),
        };

        let size = data.len();
        if size > self.config.max_size_bytes {
            return Err(CacheError::EntryTooLarge {
                key: key.to_string(),
                size,
                max: self.config.max_size_bytes,
            });
        }

        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let now = now_millis();

        let snapshot = {
            let mut state = self.state.lock().await;
            let version = state.remove(key).map(|old| old.version + 1).unwrap_or(1);

            if state.size + size > self.config.max_size_bytes {
                let evicted = state.evict_for_space(size, self.config.max_size_bytes);
                tracing::debug!(evicted, incoming = size, "Evicted entries to free space");
            }
            if state.entries.len() >= self.config.max_entries {
                let evicted = state.evict_oldest_tenth();
                tracing::debug!(evicted, limit = self.config.max_entries, "Evicted entries at capacity");
            }

            let tick = state.next_tick();
            state.entries.insert(
                key.to_string(),
                CacheEntry {
                    data,
                    timestamp: now,
                    ttl: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
                    access_count: 0,
                    last_accessed: now,
                    size,
                    version,
                    compressed,
                    tick,
                },
            );
            state.size += size;

            self.snapshot_json(&state)?
        };

        if let Some(json) = snapshot {
            self.write_snapshot(&json)?;
        }
        tracing::trace!(key = %key, size, compressed, "Cached entry");
        Ok(())
    }

    /// True for a present, unexpired entry. Touches no stats.
    pub async fn has(&self, key: &str) -> bool {
        let now = now_millis();
        let state = self.state.lock().await;
        state.entries.get(key).map(|e| !e.is_expired(now)).unwrap_or(false)
    }

    /// Returns whether an entry was removed.
    pub async fn delete(&self, key: &str) -> bool {
        let (removed, snapshot) = {
            let mut state = self.state.lock().await;
            let removed = state.remove(key).is_some();
            (removed, if removed { self.snapshot_json(&state).ok().flatten() } else { None })
        };
        if let Some(json) = snapshot {
            if let Err(e) = self.write_snapshot(&json) {
                tracing::warn!(error = %e, "Failed to persist cache snapshot after delete");
            }
        }
        removed
    }

    /// Drop every entry whose key starts with `prefix`.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let (count, snapshot) = {
            let mut state = self.state.lock().await;
            let keys: Vec<String> = state.entries.keys().filter(|k| k.starts_with(prefix)).cloned().collect();
            for key in &keys {
                state.remove(key);
            }
            let snapshot = if keys.is_empty() { None } else { self.snapshot_json(&state).ok().flatten() };
            (keys.len(), snapshot)
        };
        if let Some(json) = snapshot {
            if let Err(e) = self.write_snapshot(&json) {
                tracing::warn!(error = %e, "Failed to persist cache snapshot after invalidation");
            }
        }
        if count > 0 {
            tracing::debug!(prefix = %prefix, count, "Invalidated cache entries");
        }
        count
    }

    /// Remove all entries and reset statistics.
    pub async fn clear(&self) {
        {
            let mut state = self.state.lock().await;
            let tick = state.tick;
            *state = CacheState {
                tick,
                ..CacheState::default()
            };
        }
        if let Some(kv) = &self.persistence {
            if let Err(e) = kv.remove(&self.config.snapshot_key) {
                tracing::warn!(error = %e, "Failed to remove cache snapshot");
            }
        }
    }

    /// Remove expired entries now. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        Self::sweep(&self.state).await
    }

    async fn sweep(state: &Mutex<CacheState>) -> usize {
        let removed = state.lock().await.purge_expired(now_millis());
        if removed > 0 {
            tracing::debug!(removed, "Cache cleanup removed expired entries");
        }
        removed
    }

    /// Start the periodic expiry sweep. Calling it twice is a no-op.
    pub fn start_cleanup(&self) {
        let mut slot = self.cleanup.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return;
        }

        let state = Arc::clone(&self.state);
        let period = self.config.cleanup_interval;
        *slot = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                Self::sweep(&state).await;
            }
        }));
    }

    /// Stop the periodic sweep.
    pub fn destroy(&self) {
        if let Some(handle) = self.cleanup.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }

    pub async fn get_stats(&self) -> CacheStats {
        self.state.lock().await.stats()
    }

    pub async fn get_entry_count(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn get_size(&self) -> usize {
        self.state.lock().await.size
    }

    /// Keys of unexpired entries, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let now = now_millis();
        let state = self.state.lock().await;
        let mut keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Load the persisted snapshot, dropping anything that expired meanwhile.
    ///
    /// Returns how many entries were restored.
    pub async fn restore(&self) -> Result<usize, CacheError> {
        let kv = match &self.persistence {
            Some(kv) => kv,
            None => return Ok(0),
        };
        let json = match kv.get(&self.config.snapshot_key)? {
            Some(json) => json,
            None => return Ok(0),
        };

        let snapshot: SnapshotIn = match serde_json::from_str(&json) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable cache snapshot");
                return Ok(0);
            }
        };
        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(version = snapshot.version, "Discarding cache snapshot from another version");
            return Ok(0);
        }

        let now = now_millis();
        let mut state = self.state.lock().await;
        for (key, entry) in snapshot.entries {
            if entry.is_expired(now) || entry.size > self.config.max_size_bytes {
                continue;
            }
            if let Some(old) = state.entries.insert(key, entry.clone()) {
                state.size -= old.size;
            }
            state.size += entry.size;
        }

        // the limits may have shrunk since the snapshot was taken
        if state.size > self.config.max_size_bytes {
            state.evict_for_space(0, self.config.max_size_bytes);
        }
        while state.entries.len() > self.config.max_entries {
            state.evict_oldest_tenth();
        }
        state.tick = state.entries.values().map(|e| e.tick).max().unwrap_or(0);

        let restored = state.entries.len();
        tracing::debug!(restored, "Restored cache snapshot");
        Ok(restored)
    }

    fn snapshot_json(&self, state: &CacheState) -> Result<Option<String>, CacheError> {
        if self.persistence.is_none() {
            return Ok(None);
        }
        let snapshot = SnapshotOut {
            version: SNAPSHOT_VERSION,
            saved_at: now_millis(),
            entries: &state.entries,
        };
        Ok(Some(serde_json::to_string(&snapshot)?))
    }

    fn write_snapshot(&self, json: &str) -> Result<(), CacheError> {
        if let Some(kv) = &self.persistence {
            kv.set(&self.config.snapshot_key, json)?;
        }
        Ok(())
    }
}

impl Drop for SmartCache {
    fn drop(&mut self) {
        self.destroy();
    }
}
