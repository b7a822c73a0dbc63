//! Error taxonomy for release reconciliation.

use release_store::{InvalidNamespacedName, StoreError};

/// Errors raised while reconciling a Release.
#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("multiple ReleasePlanAdmissions found with the target ({target}) for application '{application}'")]
    MultipleAdmissions { target: String, application: String },

    #[error("found ReleasePlanAdmission '{name}' with auto-release label set to false")]
    AutoReleaseDisabled { name: String },

    #[error("no ReleasePlanAdmission found in the target ({target}) for application '{application}'")]
    NoAdmission { target: String, application: String },

    #[error("ReleasePlanAdmission '{admission}' does not reference a ReleaseStrategy")]
    MissingStrategyReference { admission: String },

    #[error("found invalid namespaced name of {kind} in release status: {source}")]
    InvalidReference {
        kind: &'static str,
        #[source]
        source: InvalidNamespacedName,
    },

    #[error("cannot set owner reference: {0}")]
    Ownership(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("snapshot sync failed: {0}")]
    SnapshotSync(String),
}

impl ReleaseError {
    /// Errors that reject the Release instead of being retried.
    pub fn is_validation(&self) -> bool {
        match self {
            ReleaseError::MultipleAdmissions { .. }
            | ReleaseError::AutoReleaseDisabled { .. }
            | ReleaseError::NoAdmission { .. }
            | ReleaseError::MissingStrategyReference { .. } => true,
            ReleaseError::Store(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// Admission failures that stop the chain at the gating step.
    pub fn is_admission_rejection(&self) -> bool {
        matches!(
            self,
            ReleaseError::MultipleAdmissions { .. } | ReleaseError::AutoReleaseDisabled { .. }
        )
    }
}

/// Result type for release reconciliation.
pub type Result<T> = std::result::Result<T, ReleaseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use release_store::NamespacedName;

    #[test]
    fn admission_messages_name_target_and_application() {
        let err = ReleaseError::MultipleAdmissions {
            target: "managed".to_string(),
            application: "app".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "multiple ReleasePlanAdmissions found with the target (managed) for application 'app'"
        );

        let err = ReleaseError::AutoReleaseDisabled {
            name: "rpa".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "found ReleasePlanAdmission 'rpa' with auto-release label set to false"
        );
    }

    #[test]
    fn validation_classification() {
        let not_found = ReleaseError::Store(StoreError::NotFound {
            kind: "Snapshot".to_string(),
            key: "tenant/s".to_string(),
        });
        assert!(not_found.is_validation());

        let transient = ReleaseError::Store(StoreError::Unavailable("timeout".to_string()));
        assert!(!transient.is_validation());

        let none = ReleaseError::NoAdmission {
            target: "managed".to_string(),
            application: "app".to_string(),
        };
        assert!(none.is_validation());
        assert!(!none.is_admission_rejection());
    }

    #[test]
    fn invalid_reference_carries_parse_error() {
        let source = NamespacedName::parse("no-separator").unwrap_err();
        let err = ReleaseError::InvalidReference {
            kind: "SnapshotEnvironmentBinding",
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("SnapshotEnvironmentBinding"));
        assert!(msg.contains("no-separator"));
        assert!(!err.is_validation());
    }
}
