//! Result type for operations that touch many items.
//!
//! A bulk read or wipe keeps going past individual failures. The outcome
//! says whether everything worked, some items failed, or nothing did.

use serde::{Deserialize, Serialize};

/// One item that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Record key, store name or step that failed.
    pub item: String,
    pub error: String,
}

impl ItemFailure {
    pub fn new(item: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            item: item.into(),
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum BulkOutcome<T> {
    Complete(T),
    Partial { value: T, failures: Vec<ItemFailure> },
    Failed { failures: Vec<ItemFailure> },
}

impl<T> BulkOutcome<T> {
    /// `Complete` when there are no failures, `Partial` otherwise.
    pub fn from_parts(value: T, failures: Vec<ItemFailure>) -> Self {
        if failures.is_empty() {
            Self::Complete(value)
        } else {
            Self::Partial { value, failures }
        }
    }

    pub fn failed(failure: ItemFailure) -> Self {
        Self::Failed {
            failures: vec![failure],
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Complete(value) | Self::Partial { value, .. } => Some(value),
            Self::Failed { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Complete(value) | Self::Partial { value, .. } => Some(value),
            Self::Failed { .. } => None,
        }
    }

    pub fn failures(&self) -> &[ItemFailure] {
        match self {
            Self::Complete(_) => &[],
            Self::Partial { failures, .. } | Self::Failed { failures } => failures,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> BulkOutcome<U> {
        match self {
            Self::Complete(value) => BulkOutcome::Complete(f(value)),
            Self::Partial { value, failures } => BulkOutcome::Partial {
                value: f(value),
                failures,
            },
            Self::Failed { failures } => BulkOutcome::Failed { failures },
        }
    }
}
