//! Release strategies and the policies they enforce.

use release_store::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Pipeline template plus the contract policy it is verified against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseStrategy {
    pub metadata: ObjectMeta,
    pub spec: ReleaseStrategySpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseStrategySpec {
    pub pipeline: String,
    /// Bundle the pipeline is resolved from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<String>,
    /// EnterpriseContractPolicy name, in the strategy's namespace.
    pub policy: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<StrategyParam>,
    /// Claim mounted as the release workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
}

/// A parameter forwarded to the release pipeline. Single values and lists are both accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyParam {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl ReleaseStrategy {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        pipeline: impl Into<String>,
        policy: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: ReleaseStrategySpec {
                pipeline: pipeline.into(),
                bundle: None,
                policy: policy.into(),
                params: Vec::new(),
                persistent_volume_claim: None,
                service_account: None,
            },
        }
    }
}

/// Opaque contract policy handed to the release pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnterpriseContractPolicy {
    pub metadata: ObjectMeta,
    pub spec: EnterpriseContractPolicySpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnterpriseContractPolicySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl EnterpriseContractPolicy {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: EnterpriseContractPolicySpec::default(),
        }
    }
}
