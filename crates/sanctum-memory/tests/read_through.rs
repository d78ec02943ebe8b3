use sanctum_crypto::KeyManager;
use sanctum_memory::{
    CacheConfig, CompressionWorker, EncryptedStore, Entity, FileKv, JournalEntry, KeyValueStore, KvKeyStore,
    SmartCache, SqliteRecordStore,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

#[tokio::test]
async fn cache_in_front_of_sqlite_store() {
    let dir = tempdir().unwrap();
    let kv: Arc<dyn KeyValueStore> = Arc::new(FileKv::open(dir.path().join("local.json")).unwrap());
    let keys = Arc::new(KeyManager::new(Arc::new(KvKeyStore::new(kv.clone()))));
    keys.ensure_key().unwrap();

    let records = Arc::new(SqliteRecordStore::open(dir.path().join("records.db")).unwrap());
    let store = EncryptedStore::new(records, keys);
    let cache = SmartCache::new(CacheConfig {
        default_ttl: Duration::from_millis(100),
        ..CacheConfig::default()
    })
    .with_compressor(Arc::new(CompressionWorker::spawn()));

    let entry = JournalEntry::new("Long day", "Wrote a lot today. ".repeat(200));
    store.store_journal(&entry).await.unwrap();

    // miss, then back-fill from the store
    let key = entry.record_key();
    assert!(cache.get::<JournalEntry>(&key).await.unwrap().is_none());
    let loaded = store.get_journal(&entry.id.to_string()).await.unwrap().unwrap();
    cache.set(&key, &loaded, None).await.unwrap();

    assert_eq!(cache.get::<JournalEntry>(&key).await.unwrap(), Some(entry.clone()));
    // compressed payload is what gets counted
    assert!(cache.get_size().await < serde_json::to_vec(&entry).unwrap().len());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(cache.get::<JournalEntry>(&key).await.unwrap().is_none());

    let stats = cache.get_stats().await;
    assert_eq!((stats.hits, stats.misses), (1, 2));
}

#[tokio::test]
async fn key_survives_reopen() {
    let dir = tempdir().unwrap();
    let kv_path = dir.path().join("local.json");
    let db_path = dir.path().join("records.db");

    {
        let kv: Arc<dyn KeyValueStore> = Arc::new(FileKv::open(&kv_path).unwrap());
        let keys = Arc::new(KeyManager::new(Arc::new(KvKeyStore::new(kv))));
        keys.ensure_key().unwrap();
        let store = EncryptedStore::new(Arc::new(SqliteRecordStore::open(&db_path).unwrap()), keys);
        store.store_encrypted("session_1", &"hello").await.unwrap();
    }

    let kv: Arc<dyn KeyValueStore> = Arc::new(FileKv::open(&kv_path).unwrap());
    let keys = Arc::new(KeyManager::new(Arc::new(KvKeyStore::new(kv))));
    keys.ensure_key().unwrap();
    let store = EncryptedStore::new(Arc::new(SqliteRecordStore::open(&db_path).unwrap()), keys);

    let value: Option<String> = store.get_encrypted("session_1").await.unwrap();
    assert_eq!(value.as_deref(), Some("hello"));
}
