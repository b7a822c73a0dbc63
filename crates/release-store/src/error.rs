//! Error types for release-store

use thiserror::Error;

/// Errors that can occur talking to the resource store.
///
/// `NotFound` is kept distinct from every other failure so callers can treat
/// an expected absence as a normal state rather than a fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Object does not exist
    #[error("{kind} \"{key}\" not found")]
    NotFound { kind: String, key: String },

    /// Object with the same namespaced name already exists
    #[error("{kind} \"{key}\" already exists")]
    AlreadyExists { kind: String, key: String },

    /// Optimistic concurrency check failed
    #[error(
        "conflict writing {kind} \"{key}\": object was modified \
         (read version {expected}, current version {actual})"
    )]
    Conflict {
        kind: String,
        key: String,
        expected: u64,
        actual: u64,
    },

    /// Object rejected by the store (missing name, namespace, ...)
    #[error("invalid {kind}: {reason}")]
    Invalid { kind: String, reason: String },

    /// Serialization error
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Transport or backend failure
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether this error means the requested object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Whether this error is an optimistic-concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub(crate) fn not_found(kind: &str, key: impl ToString) -> Self {
        StoreError::NotFound {
            kind: kind.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
