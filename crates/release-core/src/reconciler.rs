//! Fixed-order dispatch of reconcile operations for one Release.

use std::fmt;
use std::sync::Arc;

use release_store::{NamespacedName, ResourceStore, TypedStore};
use tokio::time::Instant;
use tracing::debug;

use crate::adapter::ReleaseAdapter;
use crate::domain::{Release, ReleaseError};
use crate::metrics::METRICS;
use crate::obs::{self, ReconcileSpan};
use crate::operation::OperationResult;
use crate::syncer::{SnapshotSyncer, StoreSnapshotSyncer};

/// One step of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FinalizerCalled,
    FinalizerPresent,
    AdmissionEnabled,
    PipelineRunExists,
    PipelineRunTracked,
    BindingExists,
    BindingTracked,
}

impl Operation {
    /// Every pass runs these in order, stopping at the first non-continue result.
    pub const CHAIN: [Operation; 7] = [
        Operation::FinalizerCalled,
        Operation::FinalizerPresent,
        Operation::AdmissionEnabled,
        Operation::PipelineRunExists,
        Operation::PipelineRunTracked,
        Operation::BindingExists,
        Operation::BindingTracked,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::FinalizerCalled => "ensure-finalizer-called",
            Operation::FinalizerPresent => "ensure-finalizer-present",
            Operation::AdmissionEnabled => "ensure-admission-enabled",
            Operation::PipelineRunExists => "ensure-pipeline-run-exists",
            Operation::PipelineRunTracked => "ensure-pipeline-run-tracked",
            Operation::BindingExists => "ensure-binding-exists",
            Operation::BindingTracked => "ensure-binding-tracked",
        }
    }

    pub async fn run(self, adapter: &mut ReleaseAdapter) -> OperationResult {
        match self {
            Operation::FinalizerCalled => adapter.ensure_finalizer_called().await,
            Operation::FinalizerPresent => adapter.ensure_finalizer_present().await,
            Operation::AdmissionEnabled => adapter.ensure_admission_enabled().await,
            Operation::PipelineRunExists => adapter.ensure_pipeline_run_exists().await,
            Operation::PipelineRunTracked => adapter.ensure_pipeline_run_tracked().await,
            Operation::BindingExists => adapter.ensure_binding_exists().await,
            Operation::BindingTracked => adapter.ensure_binding_tracked().await,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the driver should do after a pass.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// Nothing left to do until the next change.
    Done,
    /// Run another pass right away.
    Requeue,
    /// Retry with backoff.
    RequeueWithError(ReleaseError),
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Done => "done",
            ReconcileOutcome::Requeue => "requeue",
            ReconcileOutcome::RequeueWithError(_) => "requeue_with_error",
        }
    }
}

impl From<OperationResult> for ReconcileOutcome {
    fn from(result: OperationResult) -> Self {
        match result {
            OperationResult::Continue | OperationResult::Stop => ReconcileOutcome::Done,
            OperationResult::Requeue => ReconcileOutcome::Requeue,
            OperationResult::RequeueWithError(err) => ReconcileOutcome::RequeueWithError(err),
        }
    }
}

/// Run the operation chain against one adapter.
pub async fn run_chain(adapter: &mut ReleaseAdapter) -> ReconcileOutcome {
    for operation in Operation::CHAIN {
        let result = operation.run(adapter).await;
        if result.cancels_chain() {
            debug!(operation = %operation, result = ?result, "chain short-circuited");
            return result.into();
        }
    }
    ReconcileOutcome::Done
}

/// Reconciles Releases by key against a resource store.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn ResourceStore>,
    syncer: Arc<dyn SnapshotSyncer>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ResourceStore>, syncer: Arc<dyn SnapshotSyncer>) -> Self {
        Self { store, syncer }
    }

    /// Reconciler syncing snapshots through the same store.
    pub fn with_store(store: Arc<dyn ResourceStore>) -> Self {
        let syncer = Arc::new(StoreSnapshotSyncer::new(store.clone()));
        Self::new(store, syncer)
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// Run one pass for the Release at `key`.
    ///
    /// A Release that no longer exists is done.
    pub async fn reconcile(&self, key: &NamespacedName) -> ReconcileOutcome {
        ReconcileSpan::new(key).wrap(self.pass(key)).await
    }

    async fn pass(&self, key: &NamespacedName) -> ReconcileOutcome {
        let started = Instant::now();
        METRICS.inc_passes();

        let outcome = match self.store.get::<Release>(key).await {
            Ok(release) => {
                let mut adapter =
                    ReleaseAdapter::new(release, self.store.clone(), self.syncer.clone());
                run_chain(&mut adapter).await
            }
            Err(err) if err.is_not_found() => {
                debug!("release no longer exists");
                ReconcileOutcome::Done
            }
            Err(err) => ReconcileOutcome::RequeueWithError(err.into()),
        };

        match &outcome {
            ReconcileOutcome::Done => {}
            ReconcileOutcome::Requeue => METRICS.inc_requeues(),
            ReconcileOutcome::RequeueWithError(err) => {
                METRICS.inc_errors();
                obs::emit_pass_error(key, err);
            }
        }
        obs::emit_pass_finished(key, outcome.as_str(), started.elapsed().as_millis() as u64);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_order_is_fixed() {
        let names: Vec<&str> = Operation::CHAIN.iter().map(Operation::name).collect();
        assert_eq!(
            names,
            vec![
                "ensure-finalizer-called",
                "ensure-finalizer-present",
                "ensure-admission-enabled",
                "ensure-pipeline-run-exists",
                "ensure-pipeline-run-tracked",
                "ensure-binding-exists",
                "ensure-binding-tracked",
            ]
        );
    }

    #[test]
    fn stop_and_continue_both_finish_the_pass() {
        assert!(matches!(
            ReconcileOutcome::from(OperationResult::stop()),
            ReconcileOutcome::Done
        ));
        assert!(matches!(
            ReconcileOutcome::from(OperationResult::continue_processing()),
            ReconcileOutcome::Done
        ));
        assert!(matches!(
            ReconcileOutcome::from(OperationResult::requeue()),
            ReconcileOutcome::Requeue
        ));
    }
}
