//! Release routing: plans in the source namespace, admissions in the target.

use release_store::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Opt-out label on a ReleasePlanAdmission. Only the value `false` disables it.
pub const AUTO_RELEASE_LABEL: &str = "release.orchestrator.io/auto-release";

/// Indexed field holding an admission's origin namespace.
pub const ORIGIN_FIELD: &str = "spec.origin";

/// Routes an application from its namespace to a target namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleasePlan {
    pub metadata: ObjectMeta,
    pub spec: ReleasePlanSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleasePlanSpec {
    pub application: String,
    /// Target namespace.
    pub target: String,
}

impl ReleasePlan {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        application: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: ReleasePlanSpec {
                application: application.into(),
                target: target.into(),
            },
        }
    }
}

/// Target-side acceptance of releases for one application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleasePlanAdmission {
    pub metadata: ObjectMeta,
    pub spec: ReleasePlanAdmissionSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleasePlanAdmissionSpec {
    pub application: String,
    /// Namespace releases are accepted from.
    pub origin: String,
    /// Environment to deploy into once released, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// ReleaseStrategy name, in the admission's namespace.
    #[serde(default)]
    pub release_strategy: String,
}

impl ReleasePlanAdmission {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        application: impl Into<String>,
        origin: impl Into<String>,
        release_strategy: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: ReleasePlanAdmissionSpec {
                application: application.into(),
                origin: origin.into(),
                environment: None,
                release_strategy: release_strategy.into(),
            },
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.spec.environment = Some(environment.into());
        self
    }

    pub fn with_auto_release(mut self, value: impl Into<String>) -> Self {
        self.metadata
            .labels
            .insert(AUTO_RELEASE_LABEL.to_string(), value.into());
        self
    }

    /// Opted out only when the label is explicitly `false`.
    pub fn auto_release_disabled(&self) -> bool {
        self.metadata.label(AUTO_RELEASE_LABEL) == Some("false")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admission() -> ReleasePlanAdmission {
        ReleasePlanAdmission::new("managed", "rpa", "app", "tenant", "strategy")
    }

    #[test]
    fn auto_release_defaults_to_enabled() {
        assert!(!admission().auto_release_disabled());
        assert!(!admission().with_auto_release("true").auto_release_disabled());
        assert!(!admission().with_auto_release("no").auto_release_disabled());
    }

    #[test]
    fn auto_release_false_disables() {
        assert!(admission().with_auto_release("false").auto_release_disabled());
    }

    #[test]
    fn environment_is_optional_on_the_wire() {
        let json = serde_json::to_value(admission()).unwrap();
        assert!(json["spec"].get("environment").is_none());
        assert_eq!(json["spec"]["releaseStrategy"], "strategy");

        let with_env = serde_json::to_value(admission().with_environment("prod")).unwrap();
        assert_eq!(with_env["spec"]["environment"], "prod");
    }
}
