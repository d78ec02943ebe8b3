//! Data access audit log
//!
//! Append-only and capped: once full, the oldest entry is dropped for each
//! new one. Entries stay in insertion order and are never re-sorted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

pub const AUDIT_LOG_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Read,
    Write,
    Delete,
    Export,
    SettingsChanged,
    RetentionEnforced,
}

/// A single audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    /// Kind of data touched ("mood", "settings", ...)
    pub data_type: String,
    pub details: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    entries: VecDeque<AuditEntry>,
    capacity: usize,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_capacity(AUDIT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(AUDIT_LOG_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// Rebuild from persisted entries, keeping the newest `AUDIT_LOG_CAPACITY`.
    pub fn from_entries(entries: Vec<AuditEntry>) -> Self {
        let mut log = Self::new();
        let skip = entries.len().saturating_sub(log.capacity);
        log.entries.extend(entries.into_iter().skip(skip));
        log
    }

    pub fn record(&mut self, action: AuditAction, data_type: &str, details: Option<String>) -> &AuditEntry {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(AuditEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            data_type: data_type.to_string(),
            details,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<AuditEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
