use chrono::{Duration, Utc};
use sanctum_core::{PrivacySettingsUpdate, Sanctum, SanctumConfig};
use sanctum_memory::{JournalEntry, MoodEntry};
use serde_json::json;
use tempfile::tempdir;

fn on_disk(dir: &std::path::Path) -> SanctumConfig {
    SanctumConfig {
        data_dir: dir.to_path_buf(),
        ..SanctumConfig::default()
    }
}

#[tokio::test]
async fn records_survive_restart() {
    let dir = tempdir().unwrap();
    let entry = JournalEntry::new("Monday", "Talked to my sister.").with_tags(vec!["family".to_string()]);

    {
        let app = Sanctum::open(on_disk(dir.path())).unwrap();
        app.init().await.unwrap();
        app.save_journal(&entry).await.unwrap();
    }

    let app = Sanctum::open(on_disk(dir.path())).unwrap();
    app.init().await.unwrap();
    assert_eq!(app.load_journal(&entry.id.to_string()).await, Some(entry));

    // ciphertext only on disk
    let raw = std::fs::read(app.config().database_path()).unwrap();
    assert!(!String::from_utf8_lossy(&raw).contains("Talked to my sister"));
}

#[tokio::test]
async fn delete_all_cascades_to_records() {
    let dir = tempdir().unwrap();
    let app = Sanctum::open(on_disk(dir.path())).unwrap();
    app.init().await.unwrap();

    app.save_value("mood_1", &json!({"mood": 4})).await.unwrap();
    assert!(app.load_value::<serde_json::Value>("mood_1").await.is_some());

    let outcome = app.privacy().delete_all_user_data().await;
    assert!(outcome.is_complete(), "failures: {:?}", outcome.failures());
    assert!(!app.key_manager().has_key());

    // a fresh key epoch starts explicitly
    app.key_manager().ensure_key().unwrap();
    let value: Option<serde_json::Value> = app.store().get_encrypted("mood_1").await.unwrap();
    assert!(value.is_none());
    assert!(app.load_value::<serde_json::Value>("mood_1").await.is_none());
}

#[tokio::test]
async fn retention_window() {
    let app = Sanctum::open(SanctumConfig::in_memory()).unwrap();
    app.init().await.unwrap();
    app.privacy()
        .update_privacy_settings(&PrivacySettingsUpdate {
            data_retention_days: Some(30),
            auto_delete: Some(true),
            ..Default::default()
        })
        .unwrap();

    let now = Utc::now();
    assert!(!app.privacy().should_retain_data(now - Duration::days(31)));
    assert!(app.privacy().should_retain_data(now - Duration::days(29)));
}

#[tokio::test]
async fn export_and_report_agree() {
    let app = Sanctum::open(SanctumConfig::in_memory()).unwrap();
    app.init().await.unwrap();

    for score in [3, 6, 8] {
        app.save_mood(&MoodEntry::new(score)).await.unwrap();
    }
    app.save_journal(&JournalEntry::new("t", "c")).await.unwrap();

    let export = app.privacy().export_user_data().await.unwrap();
    assert!(export.is_complete());
    let export = export.into_value().unwrap();
    assert_eq!(export.moods.len(), 3);
    assert_eq!(export.journals.len(), 1);

    let report = app.privacy().generate_privacy_report().await.unwrap();
    assert_eq!(report.records.moods, 3);
    assert_eq!(report.records.journals, 1);
    // four writes and one export
    assert_eq!(report.audit_entries, 5);
    assert!(report.compliance.encryption_at_rest);
}
