//! Release pipeline executions.

use chrono::{DateTime, Utc};
use release_store::ObjectMeta;
use serde::{Deserialize, Serialize};

use super::condition::{find_condition, Condition};
use super::release::SUCCEEDED_CONDITION;

pub const PIPELINE_TYPE_LABEL: &str = "pipelines.orchestrator.io/type";
pub const PIPELINE_TYPE_RELEASE: &str = "release";

/// Name of the Release a pipeline run executes. Immutable lookup key.
pub const RELEASE_NAME_LABEL: &str = "release.orchestrator.io/release-name";

/// Namespace of the Release a pipeline run executes. Immutable lookup key.
pub const RELEASE_NAMESPACE_LABEL: &str = "release.orchestrator.io/release-namespace";

pub const APPLICATION_LABEL: &str = "release.orchestrator.io/application";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineRun {
    pub metadata: ObjectMeta,
    pub spec: PipelineRunSpec,
    #[serde(default)]
    pub status: PipelineRunStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunSpec {
    pub pipeline_ref: PipelineRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workspaces: Vec<WorkspaceBinding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: ParamValue,
}

impl Param {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ParamValue::String(value.into()),
        }
    }

    pub fn array(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            value: ParamValue::Array(values),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Array(Vec<String>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(value) => Some(value),
            ParamValue::Array(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceBinding {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn succeeded_condition(&self) -> Option<&Condition> {
        find_condition(&self.status.conditions, SUCCEEDED_CONDITION)
    }

    /// Terminal once the Succeeded condition is True or False.
    pub fn is_done(&self) -> bool {
        self.succeeded_condition()
            .map(|c| !c.is_unknown())
            .unwrap_or(false)
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.spec
            .params
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::condition::{set_condition, ConditionStatus};

    fn run() -> PipelineRun {
        PipelineRun {
            metadata: ObjectMeta::new("managed", "release-pipelinerun-abcde"),
            spec: PipelineRunSpec::default(),
            status: PipelineRunStatus::default(),
        }
    }

    #[test]
    fn done_only_on_terminal_condition() {
        let mut pr = run();
        assert!(!pr.is_done());

        set_condition(
            &mut pr.status.conditions,
            Condition::new(SUCCEEDED_CONDITION, ConditionStatus::Unknown, "Running", ""),
        );
        assert!(!pr.is_done());

        set_condition(
            &mut pr.status.conditions,
            Condition::new(SUCCEEDED_CONDITION, ConditionStatus::False, "Failed", "task failed"),
        );
        assert!(pr.is_done());
    }

    #[test]
    fn param_values_serialize_untagged() {
        let single = serde_json::to_value(Param::string("policy", "p")).unwrap();
        assert_eq!(single["value"], "p");

        let many = serde_json::to_value(Param::array("tags", vec!["a".into(), "b".into()])).unwrap();
        assert_eq!(many["value"], serde_json::json!(["a", "b"]));

        let back: Param = serde_json::from_value(many).unwrap();
        assert_eq!(back.value, ParamValue::Array(vec!["a".into(), "b".into()]));
    }
}
