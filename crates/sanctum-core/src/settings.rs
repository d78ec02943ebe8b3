//! Privacy settings

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionLevel {
    Standard,
    High,
    Maximum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacySettings {
    /// Days a record is kept when `auto_delete` is on
    pub data_retention_days: u32,
    pub auto_delete: bool,
    pub encryption_level: EncryptionLevel,
    pub analytics_opt_in: bool,
    pub crash_reporting: bool,
    /// Whether the user may export their data
    pub data_export: bool,
    pub data_import: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            data_retention_days: 365,
            auto_delete: false,
            encryption_level: EncryptionLevel::High,
            analytics_opt_in: false,
            crash_reporting: false,
            data_export: true,
            data_import: true,
        }
    }
}

impl PrivacySettings {
    /// Whether data written at `timestamp` is still inside the retention
    /// window as of `now`. Always true with `auto_delete` off.
    pub fn should_retain(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if !self.auto_delete {
            return true;
        }
        now - timestamp <= Duration::days(i64::from(self.data_retention_days))
    }

    /// Merge `update` in. Returns the names of fields that changed.
    pub fn apply(&mut self, update: &PrivacySettingsUpdate) -> Vec<&'static str> {
        let mut changed = Vec::new();

        macro_rules! merge {
            ($field:ident) => {
                if let Some(value) = update.$field {
                    if self.$field != value {
                        self.$field = value;
                        changed.push(stringify!($field));
                    }
                }
            };
        }

        merge!(data_retention_days);
        merge!(auto_delete);
        merge!(encryption_level);
        merge!(analytics_opt_in);
        merge!(crash_reporting);
        merge!(data_export);
        merge!(data_import);

        changed
    }
}

/// Partial update; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrivacySettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_retention_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_delete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_level: Option<EncryptionLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_opt_in: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crash_reporting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_export: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_import: Option<bool>,
}

impl PrivacySettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_window() {
        let settings = PrivacySettings {
            data_retention_days: 30,
            auto_delete: true,
            ..PrivacySettings::default()
        };
        let now = Utc::now();

        assert!(!settings.should_retain(now - Duration::days(31), now));
        assert!(settings.should_retain(now - Duration::days(29), now));
        assert!(settings.should_retain(now - Duration::days(30), now));
    }

    #[test]
    fn test_no_auto_delete_keeps_everything() {
        let settings = PrivacySettings {
            data_retention_days: 1,
            auto_delete: false,
            ..PrivacySettings::default()
        };
        let now = Utc::now();
        assert!(settings.should_retain(now - Duration::days(3650), now));
    }

    #[test]
    fn test_apply_reports_changes() {
        let mut settings = PrivacySettings::default();
        let changed = settings.apply(&PrivacySettingsUpdate {
            auto_delete: Some(true),
            data_export: Some(true), // already true
            encryption_level: Some(EncryptionLevel::Maximum),
            ..Default::default()
        });

        assert_eq!(changed, vec!["auto_delete", "encryption_level"]);
        assert!(settings.auto_delete);
        assert_eq!(settings.encryption_level, EncryptionLevel::Maximum);
        assert_eq!(settings.data_retention_days, 365);
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let update = PrivacySettingsUpdate {
            analytics_opt_in: Some(false),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"analytics_opt_in":false}"#);
        assert!(PrivacySettingsUpdate::default().is_empty());
    }
}
