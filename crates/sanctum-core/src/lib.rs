//! Sanctum Core - privacy policy and application wiring
//!
//! This crate contains the policy layer over the encrypted store
//! (retention, audit, export, delete-all, reporting), the configuration
//! file, and `Sanctum`, which builds and owns every component.

pub mod app;
pub mod audit;
pub mod config;
pub mod privacy;
pub mod settings;
pub mod validation;

pub use app::{Sanctum, SanctumError};
pub use audit::{AuditAction, AuditEntry, AuditLog, AUDIT_LOG_CAPACITY};
pub use config::{ConfigError, KeyBackend, SanctumConfig, StoreBackend};
pub use privacy::{
    ComplianceFlags, DeletionSummary, Erasable, PrivacyError, PrivacyManager, PrivacyReport, RecordCounts,
    UserDataExport,
};
pub use settings::{EncryptionLevel, PrivacySettings, PrivacySettingsUpdate};
pub use validation::{SensitiveDataScanner, ValidationReport};
