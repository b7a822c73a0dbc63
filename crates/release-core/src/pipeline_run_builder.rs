//! Fluent construction of release PipelineRun manifests.

use release_store::ObjectMeta;

use crate::domain::{
    EnterpriseContractPolicy, Param, PipelineRef, PipelineRun, Release, ReleaseStrategy, Result,
    Snapshot, WorkspaceBinding, APPLICATION_LABEL, PIPELINE_TYPE_LABEL, PIPELINE_TYPE_RELEASE,
    RELEASE_NAMESPACE_LABEL, RELEASE_NAME_LABEL,
};
use crate::ownership::set_owner_annotations;

/// Generate-name prefix of every release pipeline run.
pub const RELEASE_PIPELINE_RUN_PREFIX: &str = "release-pipelinerun";

/// Workspace the strategy's persistent volume claim is mounted as.
pub const RELEASE_WORKSPACE: &str = "release-workspace";

pub const POLICY_PARAM: &str = "enterpriseContractPolicy";
pub const SNAPSHOT_PARAM: &str = "snapshot";

/// Builds a PipelineRun whose name is generated by the store.
#[derive(Debug, Clone)]
pub struct ReleasePipelineRunBuilder {
    pipeline_run: PipelineRun,
}

impl ReleasePipelineRunBuilder {
    pub fn new(prefix: &str, namespace: impl Into<String>) -> Self {
        Self {
            pipeline_run: PipelineRun {
                metadata: ObjectMeta::generated(namespace, format!("{prefix}-")),
                spec: Default::default(),
                status: Default::default(),
            },
        }
    }

    /// Annotate the run so its changes map back to `release`.
    pub fn with_owner(mut self, release: &Release) -> Self {
        set_owner_annotations(release, &mut self.pipeline_run);
        self
    }

    /// Label the run with its release identity and application.
    pub fn with_release_and_application_metadata(
        mut self,
        release: &Release,
        application: &str,
    ) -> Self {
        let labels = &mut self.pipeline_run.metadata.labels;
        labels.insert(PIPELINE_TYPE_LABEL.to_string(), PIPELINE_TYPE_RELEASE.to_string());
        labels.insert(RELEASE_NAME_LABEL.to_string(), release.metadata.name.clone());
        labels.insert(
            RELEASE_NAMESPACE_LABEL.to_string(),
            release.metadata.namespace.clone(),
        );
        labels.insert(APPLICATION_LABEL.to_string(), application.to_string());
        self
    }

    pub fn with_release_strategy(mut self, strategy: &ReleaseStrategy) -> Self {
        let spec = &mut self.pipeline_run.spec;
        spec.pipeline_ref = PipelineRef {
            name: strategy.spec.pipeline.clone(),
            bundle: strategy.spec.bundle.clone(),
        };

        for param in &strategy.spec.params {
            let param = if param.values.is_empty() {
                Param::string(&param.name, &param.value)
            } else {
                Param::array(&param.name, param.values.clone())
            };
            spec.params.push(param);
        }

        if let Some(claim) = &strategy.spec.persistent_volume_claim {
            spec.workspaces.push(WorkspaceBinding {
                name: RELEASE_WORKSPACE.to_string(),
                persistent_volume_claim: Some(claim.clone()),
            });
        }

        spec.service_account_name = strategy.spec.service_account.clone();
        self
    }

    /// Pass the policy spec to the pipeline as a JSON string parameter.
    pub fn with_enterprise_contract_policy(
        mut self,
        policy: &EnterpriseContractPolicy,
    ) -> Result<Self> {
        let value = serde_json::to_string(&policy.spec)?;
        self.pipeline_run
            .spec
            .params
            .push(Param::string(POLICY_PARAM, value));
        Ok(self)
    }

    /// Pass the snapshot spec to the pipeline as a JSON string parameter.
    pub fn with_snapshot(mut self, snapshot: &Snapshot) -> Result<Self> {
        let value = serde_json::to_string(&snapshot.spec)?;
        self.pipeline_run
            .spec
            .params
            .push(Param::string(SNAPSHOT_PARAM, value));
        Ok(self)
    }

    pub fn build(self) -> PipelineRun {
        self.pipeline_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParamValue, StrategyParam};
    use crate::ownership::{OWNER_ANNOTATION, OWNER_KIND_ANNOTATION};

    fn strategy() -> ReleaseStrategy {
        let mut strategy = ReleaseStrategy::new("managed", "strategy", "release", "policy");
        strategy.spec.bundle = Some("quay.io/bundles/release:v1".to_string());
        strategy.spec.persistent_volume_claim = Some("release-pvc".to_string());
        strategy.spec.service_account = Some("release-sa".to_string());
        strategy.spec.params = vec![
            StrategyParam {
                name: "extraConfig".to_string(),
                value: "on".to_string(),
                values: Vec::new(),
            },
            StrategyParam {
                name: "tags".to_string(),
                value: String::new(),
                values: vec!["latest".to_string(), "v1".to_string()],
            },
        ];
        strategy
    }

    #[test]
    fn builds_a_labelled_owned_run() {
        let release = Release::new("tenant", "release-a", "plan", "snap");
        let snapshot = Snapshot::new("tenant", "snap", "app").with_component("api", "quay.io/api@sha256:1");
        let policy = EnterpriseContractPolicy::new("managed", "policy");

        let run = ReleasePipelineRunBuilder::new(RELEASE_PIPELINE_RUN_PREFIX, "managed")
            .with_owner(&release)
            .with_release_and_application_metadata(&release, "app")
            .with_release_strategy(&strategy())
            .with_enterprise_contract_policy(&policy)
            .unwrap()
            .with_snapshot(&snapshot)
            .unwrap()
            .build();

        assert_eq!(run.metadata.namespace, "managed");
        assert_eq!(run.metadata.generate_name, "release-pipelinerun-");
        assert!(run.metadata.name.is_empty());

        assert_eq!(run.metadata.label(RELEASE_NAME_LABEL), Some("release-a"));
        assert_eq!(run.metadata.label(RELEASE_NAMESPACE_LABEL), Some("tenant"));
        assert_eq!(run.metadata.label(PIPELINE_TYPE_LABEL), Some("release"));
        assert_eq!(run.metadata.label(APPLICATION_LABEL), Some("app"));
        assert_eq!(run.metadata.annotation(OWNER_ANNOTATION), Some("tenant/release-a"));
        assert_eq!(run.metadata.annotation(OWNER_KIND_ANNOTATION), Some("Release"));

        assert_eq!(run.spec.pipeline_ref.name, "release");
        assert_eq!(run.spec.service_account_name.as_deref(), Some("release-sa"));
        assert_eq!(run.spec.workspaces[0].name, RELEASE_WORKSPACE);
        assert_eq!(
            run.param("tags"),
            Some(&ParamValue::Array(vec!["latest".to_string(), "v1".to_string()]))
        );

        let snapshot_param = run.param(SNAPSHOT_PARAM).and_then(ParamValue::as_str).unwrap();
        let decoded: serde_json::Value = serde_json::from_str(snapshot_param).unwrap();
        assert_eq!(decoded["application"], "app");
        assert_eq!(decoded["components"][0]["containerImage"], "quay.io/api@sha256:1");
        assert!(run.param(POLICY_PARAM).is_some());
    }
}
