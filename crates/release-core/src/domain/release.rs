//! The Release request and its status projection.

use std::fmt;

use chrono::{DateTime, Utc};
use release_store::ObjectMeta;
use serde::{Deserialize, Serialize};

use super::condition::{find_condition, set_condition, Condition, ConditionStatus};

/// Finalizer guarding cleanup of the release pipeline run.
pub const RELEASE_FINALIZER: &str = "release.orchestrator.io/finalizer";

/// Condition tracking the release itself (validation + pipeline run).
pub const SUCCEEDED_CONDITION: &str = "Succeeded";

/// Condition tracking deployment into the target environment.
pub const DEPLOYED_CONDITION: &str = "Deployed";

/// Machine-readable reasons written into release conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    Running,
    Succeeded,
    PipelineFailed,
    /// Strategy, policy or snapshot could not be resolved, or admission is ambiguous.
    ReleaseValidationError,
    /// No usable ReleasePlanAdmission for the plan.
    ReleasePlanValidationError,
    /// The matching admission opted out of automatic releases.
    TargetDisabledError,
    Deploying,
}

impl ReleaseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseReason::Running => "Running",
            ReleaseReason::Succeeded => "Succeeded",
            ReleaseReason::PipelineFailed => "PipelineFailed",
            ReleaseReason::ReleaseValidationError => "ReleaseValidationError",
            ReleaseReason::ReleasePlanValidationError => "ReleasePlanValidationError",
            ReleaseReason::TargetDisabledError => "TargetDisabledError",
            ReleaseReason::Deploying => "Deploying",
        }
    }
}

impl fmt::Display for ReleaseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to release a snapshot through a release plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Release {
    pub metadata: ObjectMeta,
    pub spec: ReleaseSpec,
    #[serde(default)]
    pub status: ReleaseStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSpec {
    /// Snapshot name, in the release's namespace.
    pub snapshot: String,
    /// ReleasePlan name, in the release's namespace.
    pub release_plan: String,
}

/// Observed state. References are serialized as `namespace/name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_pipeline_run: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_strategy: Option<String>,

    /// Namespace the release pipeline runs in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_environment_binding: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
}

impl Release {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        release_plan: impl Into<String>,
        snapshot: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: ReleaseSpec {
                snapshot: snapshot.into(),
                release_plan: release_plan.into(),
            },
            status: ReleaseStatus::default(),
        }
    }

    fn release_condition(&self) -> Option<&Condition> {
        find_condition(&self.status.conditions, SUCCEEDED_CONDITION)
    }

    fn deployed_condition(&self) -> Option<&Condition> {
        find_condition(&self.status.conditions, DEPLOYED_CONDITION)
    }

    /// The release has been picked up (running, finished or rejected).
    pub fn has_started(&self) -> bool {
        self.release_condition().is_some()
    }

    /// The release reached a terminal state.
    pub fn is_done(&self) -> bool {
        self.release_condition()
            .map(|c| !c.is_unknown())
            .unwrap_or(false)
    }

    pub fn has_succeeded(&self) -> bool {
        self.release_condition()
            .map(Condition::is_true)
            .unwrap_or(false)
    }

    pub fn is_deploying(&self) -> bool {
        self.deployed_condition()
            .map(Condition::is_unknown)
            .unwrap_or(false)
    }

    /// Deployment reached a terminal state, successful or not.
    pub fn has_been_deployed(&self) -> bool {
        self.deployed_condition()
            .map(|c| !c.is_unknown())
            .unwrap_or(false)
    }

    pub fn mark_running(&mut self) {
        if self.status.start_time.is_none() {
            self.status.start_time = Some(Utc::now());
        }
        set_condition(
            &mut self.status.conditions,
            Condition::new(
                SUCCEEDED_CONDITION,
                ConditionStatus::Unknown,
                ReleaseReason::Running.as_str(),
                "",
            ),
        );
    }

    pub fn mark_succeeded(&mut self) {
        set_condition(
            &mut self.status.conditions,
            Condition::new(
                SUCCEEDED_CONDITION,
                ConditionStatus::True,
                ReleaseReason::Succeeded.as_str(),
                "",
            ),
        );
    }

    pub fn mark_failed(&mut self, reason: ReleaseReason, message: impl Into<String>) {
        set_condition(
            &mut self.status.conditions,
            Condition::new(
                SUCCEEDED_CONDITION,
                ConditionStatus::False,
                reason.as_str(),
                message,
            ),
        );
    }

    /// Reject the release. Terminal: stamps the completion time.
    pub fn mark_invalid(&mut self, reason: ReleaseReason, message: impl Into<String>) {
        if self.status.completion_time.is_none() {
            self.status.completion_time = Some(Utc::now());
        }
        self.mark_failed(reason, message);
    }

    pub fn mark_deploying(&mut self, reason: impl Into<String>, message: impl Into<String>) {
        set_condition(
            &mut self.status.conditions,
            Condition::new(DEPLOYED_CONDITION, ConditionStatus::Unknown, reason, message),
        );
    }

    pub fn mark_deployed(
        &mut self,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        set_condition(
            &mut self.status.conditions,
            Condition::new(DEPLOYED_CONDITION, status, reason, message),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release() -> Release {
        Release::new("tenant", "release-a", "plan-a", "snapshot-a")
    }

    #[test]
    fn fresh_release_has_not_started() {
        let r = release();
        assert!(!r.has_started());
        assert!(!r.is_done());
        assert!(!r.has_succeeded());
        assert!(!r.has_been_deployed());
    }

    #[test]
    fn running_then_succeeded() {
        let mut r = release();
        r.mark_running();
        assert!(r.has_started());
        assert!(!r.is_done());
        assert!(r.status.start_time.is_some());

        r.mark_succeeded();
        assert!(r.is_done());
        assert!(r.has_succeeded());
    }

    #[test]
    fn invalid_is_terminal_and_not_succeeded() {
        let mut r = release();
        r.mark_invalid(ReleaseReason::TargetDisabledError, "auto-release disabled");
        assert!(r.is_done());
        assert!(!r.has_succeeded());
        assert!(r.status.completion_time.is_some());

        let c = find_condition(&r.status.conditions, SUCCEEDED_CONDITION).unwrap();
        assert_eq!(c.reason, "TargetDisabledError");
        assert_eq!(c.message, "auto-release disabled");
    }

    #[test]
    fn deployment_progresses_independently() {
        let mut r = release();
        r.mark_running();
        r.mark_succeeded();

        r.mark_deploying("CommitsUnsynced", "1 of 2 components deployed");
        assert!(r.is_deploying());
        assert!(!r.has_been_deployed());

        r.mark_deployed(ConditionStatus::True, "CommitsSynced", "2 of 2 components deployed");
        assert!(r.has_been_deployed());
        assert!(r.has_succeeded());
    }

    #[test]
    fn failed_deployment_is_terminal() {
        let mut r = release();
        r.mark_deployed(ConditionStatus::False, "ErrorOccurred", "sync failed");
        assert!(r.has_been_deployed());
        assert!(!r.is_deploying());
    }

    #[test]
    fn status_defaults_when_absent() {
        let json = serde_json::json!({
            "metadata": {"name": "r", "namespace": "tenant"},
            "spec": {"snapshot": "s", "releasePlan": "p"}
        });
        let r: Release = serde_json::from_value(json).expect("deserialize");
        assert_eq!(r.status, ReleaseStatus::default());
        assert_eq!(r.spec.release_plan, "p");
    }
}
