//! Privacy manager
//!
//! Policy layer over the encrypted store: retention, audit trail, export,
//! delete-everything and a compliance report. Settings and the audit log
//! are persisted to the local key/value store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;

use sanctum_memory::{
    BulkOutcome, EncryptedStore, Entity, ItemFailure, JournalEntry, KeyValueStore, MoodEntry, Session, SmartCache,
    StorageError, StoreError,
};

use crate::audit::{AuditAction, AuditEntry, AuditLog};
use crate::settings::{PrivacySettings, PrivacySettingsUpdate};
use crate::validation::{SensitiveDataScanner, ValidationReport};

const SETTINGS_KEY: &str = "sanctum_privacy_settings";
const AUDIT_KEY: &str = "sanctum_audit_log";

#[derive(Error, Debug)]
pub enum PrivacyError {
    #[error("Data export is disabled in privacy settings")]
    ExportDisabled,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid sensitive data pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A holder of user data that delete-all must empty.
#[async_trait]
pub trait Erasable: Send + Sync {
    fn name(&self) -> &str;
    async fn erase(&self) -> Result<(), StorageError>;
}

#[async_trait]
impl Erasable for SmartCache {
    fn name(&self) -> &str {
        "cache"
    }

    async fn erase(&self) -> Result<(), StorageError> {
        self.clear().await;
        Ok(())
    }
}

/// Everything we hold about the user, decrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDataExport {
    pub exported_at: DateTime<Utc>,
    pub settings: PrivacySettings,
    pub audit_log: Vec<AuditEntry>,
    pub sessions: Vec<Session>,
    pub moods: Vec<MoodEntry>,
    pub journals: Vec<JournalEntry>,
}

/// What delete-all managed to remove.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeletionSummary {
    pub records_deleted: usize,
    pub stores_cleared: Vec<String>,
    pub files_removed: Vec<PathBuf>,
    pub key_cleared: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordCounts {
    pub sessions: usize,
    pub moods: usize,
    pub journals: usize,
    pub other: usize,
    /// Ciphertext bytes across all records
    pub total_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceFlags {
    pub encryption_at_rest: bool,
    pub retention_enforced: bool,
    pub export_available: bool,
    pub analytics_consent: bool,
    pub crash_reporting: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyReport {
    pub generated_at: DateTime<Utc>,
    pub settings: PrivacySettings,
    pub records: RecordCounts,
    pub oldest_record: Option<DateTime<Utc>>,
    /// Records the current retention window would delete
    pub records_past_retention: usize,
    pub audit_entries: usize,
    pub compliance: ComplianceFlags,
}

/// Database files to remove on delete-all.
struct DatabaseFiles {
    dir: PathBuf,
    prefix: String,
    /// File names still open by a live store; their records are wiped instead.
    live: Vec<String>,
}

pub struct PrivacyManager {
    kv: Arc<dyn KeyValueStore>,
    store: Arc<EncryptedStore>,
    settings: RwLock<PrivacySettings>,
    audit: Mutex<AuditLog>,
    scanner: SensitiveDataScanner,
    erasables: Vec<Arc<dyn Erasable>>,
    database_files: Option<DatabaseFiles>,
}

impl PrivacyManager {
    /// Load settings and the audit log from `kv`. Unreadable state is
    /// replaced by defaults rather than failing startup.
    pub fn new(kv: Arc<dyn KeyValueStore>, store: Arc<EncryptedStore>) -> Result<Self, PrivacyError> {
        let settings = match kv.get(SETTINGS_KEY)? {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Stored privacy settings unreadable, using defaults");
                PrivacySettings::default()
            }),
            None => PrivacySettings::default(),
        };

        let audit = match kv.get(AUDIT_KEY)? {
            Some(json) => match serde_json::from_str::<Vec<AuditEntry>>(&json) {
                Ok(entries) => AuditLog::from_entries(entries),
                Err(e) => {
                    tracing::warn!(error = %e, "Stored audit log unreadable, starting a new one");
                    AuditLog::new()
                }
            },
            None => AuditLog::new(),
        };

        Ok(Self {
            kv,
            store,
            settings: RwLock::new(settings),
            audit: Mutex::new(audit),
            scanner: SensitiveDataScanner::new()?,
            erasables: Vec::new(),
            database_files: None,
        })
    }

    /// Also empty `target` on delete-all.
    pub fn with_erasable(mut self, target: Arc<dyn Erasable>) -> Self {
        self.erasables.push(target);
        self
    }

    /// Remove files in `dir` whose names start with `prefix` on delete-all,
    /// except the `live` ones and their sidecar files.
    pub fn with_database_files(mut self, dir: impl Into<PathBuf>, prefix: &str, live: Vec<String>) -> Self {
        self.database_files = Some(DatabaseFiles {
            dir: dir.into(),
            prefix: prefix.to_string(),
            live,
        });
        self
    }

    pub fn get_privacy_settings(&self) -> PrivacySettings {
        self.settings.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Merge `update`, persist, and audit the change.
    pub fn update_privacy_settings(&self, update: &PrivacySettingsUpdate) -> Result<PrivacySettings, PrivacyError> {
        let (updated, changed) = {
            let mut settings = self.settings.write().unwrap_or_else(|e| e.into_inner());
            let mut candidate = settings.clone();
            let changed = candidate.apply(update);
            if changed.is_empty() {
                return Ok(candidate);
            }
            self.kv.set(SETTINGS_KEY, &serde_json::to_string(&candidate)?)?;
            *settings = candidate.clone();
            (candidate, changed)
        };

        tracing::info!(changed = ?changed, "Privacy settings updated");
        self.log_data_access(AuditAction::SettingsChanged, "settings", Some(changed.join(",")));
        Ok(updated)
    }

    /// Whether data written at `timestamp` is inside the retention window.
    /// Deletes nothing; see `enforce_retention`.
    pub fn should_retain_data(&self, timestamp: DateTime<Utc>) -> bool {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .should_retain(timestamp, Utc::now())
    }

    /// Delete every record outside the retention window.
    ///
    /// When anything was purged the registered erasables (the cache) are
    /// emptied too, so no copy of a purged record outlives it.
    pub async fn enforce_retention(&self) -> BulkOutcome<usize> {
        let settings = self.get_privacy_settings();
        if !settings.auto_delete {
            return BulkOutcome::Complete(0);
        }

        let now = Utc::now();
        let (deleted, mut failures) = match self.store.purge(|ts| settings.should_retain(ts, now)).await {
            BulkOutcome::Complete(deleted) => (deleted, Vec::new()),
            BulkOutcome::Partial { value, failures } => (value, failures),
            failed @ BulkOutcome::Failed { .. } => return failed,
        };

        if deleted > 0 {
            for target in &self.erasables {
                if let Err(e) = target.erase().await {
                    tracing::warn!(target = target.name(), error = %e, "Failed to drop purged records");
                    failures.push(ItemFailure::new(target.name(), e));
                }
            }
            self.log_data_access(
                AuditAction::RetentionEnforced,
                "records",
                Some(format!("{} deleted", deleted)),
            );
        }
        BulkOutcome::from_parts(deleted, failures)
    }

    /// Append to the audit log and persist it. Persistence failures are
    /// logged, the in-memory entry is kept.
    pub fn log_data_access(&self, action: AuditAction, data_type: &str, details: Option<String>) {
        let json = {
            let mut audit = self.audit.lock().unwrap_or_else(|e| e.into_inner());
            audit.record(action, data_type, details);
            serde_json::to_string(&audit.to_vec())
        };

        let persisted = match json {
            Ok(json) => self.kv.set(AUDIT_KEY, &json).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = persisted {
            tracing::warn!(error = %e, "Failed to persist audit log");
        }
    }

    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.audit.lock().unwrap_or_else(|e| e.into_inner()).to_vec()
    }

    /// Decrypt and bundle everything held about the user.
    ///
    /// Records that fail to decrypt are listed as failures; the rest is
    /// still exported.
    pub async fn export_user_data(&self) -> Result<BulkOutcome<UserDataExport>, PrivacyError> {
        let settings = self.get_privacy_settings();
        if !settings.data_export {
            return Err(PrivacyError::ExportDisabled);
        }

        let mut failures = Vec::new();
        let mut failed_parts = 0;
        let sessions = collect(self.store.get_all::<Session>().await, &mut failures, &mut failed_parts);
        let moods = collect(self.store.get_all::<MoodEntry>().await, &mut failures, &mut failed_parts);
        let journals = collect(self.store.get_all::<JournalEntry>().await, &mut failures, &mut failed_parts);

        if failed_parts == 3 {
            tracing::warn!(failures = failures.len(), "Export failed");
            return Ok(BulkOutcome::Failed { failures });
        }

        let count = sessions.len() + moods.len() + journals.len();
        self.log_data_access(AuditAction::Export, "all", Some(format!("{} records", count)));

        let export = UserDataExport {
            exported_at: Utc::now(),
            settings,
            audit_log: self.audit_log(),
            sessions,
            moods,
            journals,
        };
        Ok(BulkOutcome::from_parts(export, failures))
    }

    /// Best-effort wipe of everything: records, registered stores, the
    /// local key/value store, the device key and our database files.
    ///
    /// Each step runs regardless of earlier failures. The key is cleared,
    /// so even a record that survived is unreadable from here on.
    pub async fn delete_all_user_data(&self) -> BulkOutcome<DeletionSummary> {
        let mut summary = DeletionSummary::default();
        let mut failures = Vec::new();
        let mut steps_ok = 0;

        match self.store.wipe().await {
            Ok(count) => {
                summary.records_deleted = count;
                summary.stores_cleared.push(self.store.store_name().to_string());
                steps_ok += 1;
            }
            Err(e) => failures.push(ItemFailure::new(self.store.store_name(), e)),
        }

        for target in &self.erasables {
            match target.erase().await {
                Ok(()) => {
                    summary.stores_cleared.push(target.name().to_string());
                    steps_ok += 1;
                }
                Err(e) => failures.push(ItemFailure::new(target.name(), e)),
            }
        }

        match self.kv.clear() {
            Ok(()) => {
                summary.stores_cleared.push("local".to_string());
                steps_ok += 1;
            }
            Err(e) => failures.push(ItemFailure::new("local", e)),
        }

        match self.store.key_manager().clear() {
            Ok(()) => {
                summary.key_cleared = true;
                steps_ok += 1;
            }
            Err(e) => failures.push(ItemFailure::new("device_key", e)),
        }

        if let Some(files) = &self.database_files {
            match remove_database_files(files) {
                Ok((removed, errors)) => {
                    steps_ok += 1;
                    summary.files_removed = removed;
                    failures.extend(errors);
                }
                Err(e) => failures.push(ItemFailure::new(files.dir.display().to_string(), e)),
            }
        }

        *self.settings.write().unwrap_or_else(|e| e.into_inner()) = PrivacySettings::default();
        self.audit.lock().unwrap_or_else(|e| e.into_inner()).clear();

        if failures.is_empty() {
            tracing::info!(records = summary.records_deleted, "All user data deleted");
        } else {
            tracing::warn!(failures = failures.len(), "User data deletion incomplete");
        }

        if steps_ok == 0 {
            BulkOutcome::Failed { failures }
        } else {
            BulkOutcome::from_parts(summary, failures)
        }
    }

    /// Counts, retention status and compliance flags. Reads record
    /// metadata only; nothing is decrypted.
    pub async fn generate_privacy_report(&self) -> Result<PrivacyReport, PrivacyError> {
        let settings = self.get_privacy_settings();
        let summaries = self.store.record_summaries().await?;
        let now = Utc::now();

        let mut records = RecordCounts::default();
        for summary in &summaries {
            let key = summary.key.as_str();
            if key.starts_with(Session::PREFIX) {
                records.sessions += 1;
            } else if key.starts_with(MoodEntry::PREFIX) {
                records.moods += 1;
            } else if key.starts_with(JournalEntry::PREFIX) {
                records.journals += 1;
            } else {
                records.other += 1;
            }
            records.total_bytes += summary.size;
        }

        Ok(PrivacyReport {
            generated_at: now,
            oldest_record: summaries.iter().map(|s| s.timestamp).min(),
            records_past_retention: summaries
                .iter()
                .filter(|s| !settings.should_retain(s.timestamp, now))
                .count(),
            audit_entries: self.audit.lock().unwrap_or_else(|e| e.into_inner()).len(),
            compliance: ComplianceFlags {
                encryption_at_rest: self.store.key_manager().has_key(),
                retention_enforced: settings.auto_delete,
                export_available: settings.data_export,
                analytics_consent: settings.analytics_opt_in,
                crash_reporting: settings.crash_reporting,
            },
            records,
            settings,
        })
    }

    /// Advisory scan of `value` for identifiers and credentials.
    pub fn validate_data_for_storage<T: Serialize + ?Sized>(&self, value: &T) -> Result<ValidationReport, PrivacyError> {
        Ok(self.scanner.validate(value)?)
    }
}

fn collect<T>(outcome: BulkOutcome<Vec<T>>, failures: &mut Vec<ItemFailure>, failed_parts: &mut usize) -> Vec<T> {
    failures.extend_from_slice(outcome.failures());
    if outcome.is_failed() {
        *failed_parts += 1;
    }
    outcome.into_value().unwrap_or_default()
}

fn remove_database_files(files: &DatabaseFiles) -> std::io::Result<(Vec<PathBuf>, Vec<ItemFailure>)> {
    let mut removed = Vec::new();
    let mut failures = Vec::new();
    if !files.dir.exists() {
        return Ok((removed, failures));
    }

    for entry in std::fs::read_dir(&files.dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(&files.prefix) || files.live.iter().any(|live| name.starts_with(live.as_str())) {
            continue;
        }
        if !entry.file_type()?.is_file() {
            continue;
        }

        let path = entry.path();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed database file");
                removed.push(path);
            }
            Err(e) => failures.push(ItemFailure::new(path.display().to_string(), e)),
        }
    }
    Ok((removed, failures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sanctum_crypto::KeyManager;
    use sanctum_memory::{CacheConfig, KvKeyStore, MemoryKv, MemoryRecordStore, RecordStore};
    use serde_json::json;
    use tempfile::tempdir;

    struct Fixture {
        kv: Arc<dyn KeyValueStore>,
        records: Arc<MemoryRecordStore>,
        store: Arc<EncryptedStore>,
    }

    fn fixture() -> Fixture {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKv::new());
        let keys = Arc::new(KeyManager::new(Arc::new(KvKeyStore::new(kv.clone()))));
        keys.ensure_key().unwrap();
        let records = Arc::new(MemoryRecordStore::default());
        let store = Arc::new(EncryptedStore::new(records.clone(), keys));
        Fixture { kv, records, store }
    }

    fn manager(f: &Fixture) -> PrivacyManager {
        PrivacyManager::new(f.kv.clone(), f.store.clone()).unwrap()
    }

    struct Stuck;

    #[async_trait]
    impl Erasable for Stuck {
        fn name(&self) -> &str {
            "stuck"
        }
        async fn erase(&self) -> Result<(), StorageError> {
            Err(StorageError::Write("locked by another process".to_string()))
        }
    }

    #[test]
    fn test_retention_scenario() {
        let f = fixture();
        let privacy = manager(&f);
        privacy
            .update_privacy_settings(&PrivacySettingsUpdate {
                data_retention_days: Some(30),
                auto_delete: Some(true),
                ..Default::default()
            })
            .unwrap();

        let now = Utc::now();
        assert!(!privacy.should_retain_data(now - Duration::days(31)));
        assert!(privacy.should_retain_data(now - Duration::days(29)));
    }

    #[test]
    fn test_settings_persist_and_audit() {
        let f = fixture();
        let privacy = manager(&f);
        privacy
            .update_privacy_settings(&PrivacySettingsUpdate {
                analytics_opt_in: Some(true),
                ..Default::default()
            })
            .unwrap();

        let reloaded = manager(&f);
        assert!(reloaded.get_privacy_settings().analytics_opt_in);

        let audit = reloaded.audit_log();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, AuditAction::SettingsChanged);
        assert_eq!(audit[0].details.as_deref(), Some("analytics_opt_in"));

        // no-op update leaves no trace
        reloaded.update_privacy_settings(&PrivacySettingsUpdate::default()).unwrap();
        assert_eq!(reloaded.audit_log().len(), 1);
    }

    #[test]
    fn test_settings_write_failure_keeps_old_settings() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKv::with_quota(8));
        let keys = Arc::new(KeyManager::new(Arc::new(KvKeyStore::new(Arc::new(MemoryKv::new())))));
        let store = Arc::new(EncryptedStore::new(Arc::new(MemoryRecordStore::default()), keys));
        let privacy = PrivacyManager::new(kv, store).unwrap();

        let err = privacy
            .update_privacy_settings(&PrivacySettingsUpdate {
                auto_delete: Some(true),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, PrivacyError::Storage(StorageError::QuotaExceeded { .. })));
        assert!(!privacy.get_privacy_settings().auto_delete);
    }

    #[tokio::test]
    async fn test_enforce_retention_purges_old_records() {
        let f = fixture();
        f.store.store_encrypted("mood_old", &json!({"mood": 2})).await.unwrap();
        f.store.store_encrypted("mood_new", &json!({"mood": 7})).await.unwrap();

        let mut old = f.records.get("mood_old").await.unwrap().unwrap();
        old.timestamp = Utc::now() - Duration::days(31);
        f.records.put(old).await.unwrap();

        let privacy = manager(&f);
        // auto_delete off: nothing goes
        assert_eq!(privacy.enforce_retention().await, BulkOutcome::Complete(0));

        privacy
            .update_privacy_settings(&PrivacySettingsUpdate {
                data_retention_days: Some(30),
                auto_delete: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(privacy.enforce_retention().await, BulkOutcome::Complete(1));
        assert!(f.store.get_encrypted::<serde_json::Value>("mood_old").await.unwrap().is_none());
        assert_eq!(privacy.audit_log().last().unwrap().action, AuditAction::RetentionEnforced);
    }

    #[tokio::test]
    async fn test_enforce_retention_empties_cache() {
        let f = fixture();
        f.store.store_encrypted("mood_old", &json!({"mood": 2})).await.unwrap();
        let mut old = f.records.get("mood_old").await.unwrap().unwrap();
        old.timestamp = Utc::now() - Duration::days(31);
        f.records.put(old).await.unwrap();

        let cache = Arc::new(SmartCache::new(CacheConfig::default()));
        cache.set("mood_old", &json!({"mood": 2}), None).await.unwrap();

        let privacy = manager(&f).with_erasable(cache.clone()).with_erasable(Arc::new(Stuck));
        privacy
            .update_privacy_settings(&PrivacySettingsUpdate {
                data_retention_days: Some(30),
                auto_delete: Some(true),
                ..Default::default()
            })
            .unwrap();

        let outcome = privacy.enforce_retention().await;
        assert_eq!(outcome.value(), Some(&1));
        assert_eq!(outcome.failures().len(), 1);
        assert_eq!(outcome.failures()[0].item, "stuck");
        assert!(!cache.has("mood_old").await);

        // nothing purged: the cache is left alone
        cache.set("mood_new", &json!({"mood": 7}), None).await.unwrap();
        assert_eq!(privacy.enforce_retention().await, BulkOutcome::Complete(0));
        assert!(cache.has("mood_new").await);
    }

    #[tokio::test]
    async fn test_export_requires_setting() {
        let f = fixture();
        let privacy = manager(&f);
        privacy
            .update_privacy_settings(&PrivacySettingsUpdate {
                data_export: Some(false),
                ..Default::default()
            })
            .unwrap();

        assert!(matches!(privacy.export_user_data().await, Err(PrivacyError::ExportDisabled)));
    }

    #[tokio::test]
    async fn test_export_reports_unreadable_records() {
        let f = fixture();
        let mood = MoodEntry::new(6);
        f.store.store_mood(&mood).await.unwrap();
        f.store.store_journal(&JournalEntry::new("Sunday", "quiet")).await.unwrap();
        f.store.store_encrypted("mood_broken", &"not a mood entry").await.unwrap();

        let privacy = manager(&f);
        let outcome = privacy.export_user_data().await.unwrap();

        assert_eq!(outcome.failures().len(), 1);
        assert_eq!(outcome.failures()[0].item, "mood_broken");
        let export = outcome.into_value().unwrap();
        assert_eq!(export.moods, vec![mood]);
        assert_eq!(export.journals.len(), 1);
        assert!(export.audit_log.iter().any(|e| e.action == AuditAction::Export));
    }

    #[tokio::test]
    async fn test_delete_all_collects_failures() {
        let f = fixture();
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("sanctum_old.db"), b"x").unwrap();
        std::fs::write(dir.path().join("sanctum_records.db"), b"live").unwrap();
        std::fs::write(dir.path().join("other.db"), b"keep").unwrap();

        f.store.store_encrypted("mood_1", &json!({"mood": 4})).await.unwrap();
        let cache = Arc::new(SmartCache::new(CacheConfig::default()));
        cache.set("mood_1", &json!({"mood": 4}), None).await.unwrap();

        let privacy = manager(&f)
            .with_erasable(cache.clone())
            .with_erasable(Arc::new(Stuck))
            .with_database_files(dir.path(), "sanctum_", vec!["sanctum_records.db".to_string()]);
        privacy
            .update_privacy_settings(&PrivacySettingsUpdate {
                crash_reporting: Some(true),
                ..Default::default()
            })
            .unwrap();

        let outcome = privacy.delete_all_user_data().await;
        assert_eq!(outcome.failures().len(), 1);
        assert_eq!(outcome.failures()[0].item, "stuck");

        let summary = outcome.into_value().unwrap();
        assert_eq!(summary.records_deleted, 1);
        assert!(summary.key_cleared);
        assert_eq!(summary.files_removed, vec![dir.path().join("sanctum_old.db")]);
        assert!(dir.path().join("sanctum_records.db").exists());
        assert!(dir.path().join("other.db").exists());

        assert_eq!(cache.get_entry_count().await, 0);
        assert!(f.kv.keys().unwrap().is_empty());
        assert!(!f.store.key_manager().has_key());
        assert_eq!(privacy.get_privacy_settings(), PrivacySettings::default());
        assert!(privacy.audit_log().is_empty());
    }

    #[tokio::test]
    async fn test_report_counts_by_type() {
        let f = fixture();
        f.store.store_session(&Session::new()).await.unwrap();
        f.store.store_mood(&MoodEntry::new(3)).await.unwrap();
        f.store.store_mood(&MoodEntry::new(9)).await.unwrap();
        f.store.store_encrypted("draft_1", &"misc").await.unwrap();

        let privacy = manager(&f);
        privacy.log_data_access(AuditAction::Read, "mood", None);
        let report = privacy.generate_privacy_report().await.unwrap();

        assert_eq!(report.records.sessions, 1);
        assert_eq!(report.records.moods, 2);
        assert_eq!(report.records.journals, 0);
        assert_eq!(report.records.other, 1);
        assert!(report.records.total_bytes > 0);
        assert!(report.oldest_record.is_some());
        assert_eq!(report.records_past_retention, 0);
        assert_eq!(report.audit_entries, 1);
        assert!(report.compliance.encryption_at_rest);
        assert!(!report.compliance.retention_enforced);
        assert!(report.compliance.export_available);
    }

    #[test]
    fn test_validate_is_advisory() {
        let f = fixture();
        let privacy = manager(&f);
        let report = privacy
            .validate_data_for_storage(&JournalEntry::new("bank", "pin stuff, password: letmein"))
            .unwrap();
        assert!(!report.valid);
        let clean = json!({"mood": 5, "note": "walked by the river"});
        assert!(privacy.validate_data_for_storage(&clean).unwrap().valid);
    }
}
