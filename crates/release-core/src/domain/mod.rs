//! Domain models for release orchestration.
//!
//! Canonical definitions for the resources the controller reads and writes:
//! - `Release`: the request under reconciliation
//! - `ReleasePlan` / `ReleasePlanAdmission`: source and target routing
//! - `ReleaseStrategy` / `EnterpriseContractPolicy`: how a release is executed
//! - `PipelineRun`: the release execution
//! - `SnapshotEnvironmentBinding`: the downstream deployment

macro_rules! impl_resource {
    ($($ty:ty => $kind:literal),+ $(,)?) => {
        $(
            impl release_store::Resource for $ty {
                const KIND: &'static str = $kind;

                fn meta(&self) -> &release_store::ObjectMeta {
                    &self.metadata
                }

                fn meta_mut(&mut self) -> &mut release_store::ObjectMeta {
                    &mut self.metadata
                }
            }
        )+
    };
}

pub mod application;
pub mod binding;
pub mod condition;
pub mod error;
pub mod pipeline_run;
pub mod plan;
pub mod release;
pub mod strategy;

// Re-export main types and errors
pub use application::{Application, Component, Environment, Snapshot, SnapshotComponent};
pub use binding::{
    BindingComponent, BindingComponentConfiguration, SnapshotEnvironmentBinding,
    ALL_COMPONENTS_DEPLOYED, ENVIRONMENT_FIELD,
};
pub use condition::{find_condition, set_condition, Condition, ConditionStatus};
pub use error::{ReleaseError, Result};
pub use pipeline_run::{
    Param, ParamValue, PipelineRef, PipelineRun, WorkspaceBinding, APPLICATION_LABEL,
    PIPELINE_TYPE_LABEL, PIPELINE_TYPE_RELEASE, RELEASE_NAMESPACE_LABEL, RELEASE_NAME_LABEL,
};
pub use plan::{ReleasePlan, ReleasePlanAdmission, AUTO_RELEASE_LABEL, ORIGIN_FIELD};
pub use release::{
    Release, ReleaseReason, DEPLOYED_CONDITION, RELEASE_FINALIZER, SUCCEEDED_CONDITION,
};
pub use strategy::{EnterpriseContractPolicy, ReleaseStrategy, StrategyParam};

impl_resource! {
    Release => "Release",
    ReleasePlan => "ReleasePlan",
    ReleasePlanAdmission => "ReleasePlanAdmission",
    ReleaseStrategy => "ReleaseStrategy",
    EnterpriseContractPolicy => "EnterpriseContractPolicy",
    Application => "Application",
    Component => "Component",
    Snapshot => "Snapshot",
    Environment => "Environment",
    PipelineRun => "PipelineRun",
    SnapshotEnvironmentBinding => "SnapshotEnvironmentBinding",
}
