//! Release-Core: reconciliation core of the release controller
//!
//! Given a `Release`, the core validates it against the target's admission
//! policy, triggers and tracks the release pipeline run, then triggers and
//! tracks the deployment binding. Every pass re-reads state from the
//! resource store and relies on idempotent ensure-operations.
//!
//! ## Key Components
//!
//! - `ReleaseAdapter`: the seven ensure-operations over one Release
//! - `Reconciler`: fixed-order dispatch of one pass, keyed by Release
//! - `ReleaseController`: concurrent driver with backoff and resync
//! - `ReleasePipelineRunBuilder` / `new_snapshot_environment_binding`:
//!   manifests for the objects the core creates

pub mod adapter;
pub mod admission;
pub mod binding_builder;
pub mod config;
pub mod controller;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod operation;
pub mod ownership;
pub mod pipeline_run_builder;
pub mod reconciler;
pub mod syncer;
pub mod telemetry;

pub use adapter::ReleaseAdapter;
pub use admission::{resolve_active_admission, select_active_admission};
pub use binding_builder::new_snapshot_environment_binding;
pub use config::ControllerConfig;
pub use controller::ReleaseController;
pub use domain::{
    Application, Component, Condition, ConditionStatus, EnterpriseContractPolicy, Environment,
    PipelineRun, Release, ReleaseError, ReleasePlan, ReleasePlanAdmission, ReleaseReason,
    ReleaseStrategy, Result, Snapshot, SnapshotEnvironmentBinding,
};
pub use operation::OperationResult;
pub use ownership::{owner_from_annotations, set_controller_reference, set_owner_annotations};
pub use pipeline_run_builder::ReleasePipelineRunBuilder;
pub use reconciler::{run_chain, Operation, ReconcileOutcome, Reconciler};
pub use syncer::{SnapshotSyncer, StoreSnapshotSyncer};

pub use metrics::METRICS;
pub use obs::ReconcileSpan;
pub use telemetry::{init_tracing, TelemetryConfig};

/// Release-Core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
