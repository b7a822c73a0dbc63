//! Snapshot deployments into an environment.

use release_store::ObjectMeta;
use serde::{Deserialize, Serialize};

use super::condition::{find_condition, Condition};

/// Aggregate condition reported once every component has been synced.
pub const ALL_COMPONENTS_DEPLOYED: &str = "AllComponentsDeployed";

/// Indexed field holding a binding's environment name.
pub const ENVIRONMENT_FIELD: &str = "spec.environment";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotEnvironmentBinding {
    pub metadata: ObjectMeta,
    pub spec: BindingSpec,
    #[serde(default)]
    pub status: BindingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BindingSpec {
    pub application: String,
    pub environment: String,
    pub snapshot: String,
    #[serde(default)]
    pub components: Vec<BindingComponent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BindingComponent {
    pub name: String,
    pub configuration: BindingComponentConfiguration,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BindingComponentConfiguration {
    pub replicas: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BindingStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_deployment_conditions: Vec<Condition>,
}

impl SnapshotEnvironmentBinding {
    pub fn deployment_condition(&self) -> Option<&Condition> {
        find_condition(
            &self.status.component_deployment_conditions,
            ALL_COMPONENTS_DEPLOYED,
        )
    }
}
