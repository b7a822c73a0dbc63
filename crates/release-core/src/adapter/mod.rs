//! Per-release adapter carrying every reconcile operation.
//!
//! An adapter wraps one freshly read Release for the duration of a single
//! pass. Operations are split by concern:
//! - `finalizer`: cleanup-before-delete
//! - `pipeline`: release pipeline run creation and tracking
//! - `deployment`: snapshot environment binding creation and tracking
//!
//! Every status write snapshots the Release, mutates it in memory and patches
//! it conditionally on the snapshot's version. A failed write restores the
//! in-memory copy and surfaces as `RequeueWithError`.

mod deployment;
mod finalizer;
mod pipeline;

use std::sync::Arc;

use release_store::{ListParams, NamespacedName, Precondition, ResourceStore, TypedStore};
use tracing::debug;

use crate::admission::resolve_active_admission;
use crate::domain::{
    PipelineRun, Release, ReleaseError, ReleasePlan, ReleasePlanAdmission, ReleaseReason, Result,
    Snapshot, RELEASE_NAMESPACE_LABEL, RELEASE_NAME_LABEL,
};
use crate::metrics::METRICS;
use crate::obs;
use crate::operation::OperationResult;
use crate::syncer::SnapshotSyncer;

/// Operations over one Release, backed by a resource store.
pub struct ReleaseAdapter {
    release: Release,
    store: Arc<dyn ResourceStore>,
    syncer: Arc<dyn SnapshotSyncer>,
}

impl ReleaseAdapter {
    pub fn new(
        release: Release,
        store: Arc<dyn ResourceStore>,
        syncer: Arc<dyn SnapshotSyncer>,
    ) -> Self {
        Self {
            release,
            store,
            syncer,
        }
    }

    /// The Release as last written by this adapter.
    pub fn release(&self) -> &Release {
        &self.release
    }

    pub fn into_release(self) -> Release {
        self.release
    }

    fn key(&self) -> NamespacedName {
        self.release.metadata.key()
    }

    /// Patch metadata and spec of the Release.
    async fn patch_release<F>(&mut self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Release) + Send,
    {
        let original = self.release.clone();
        let precondition = Precondition::merge_from(&original);
        mutate(&mut self.release);
        if let Err(err) = self.store.patch(&mut self.release, precondition).await {
            self.release = original;
            return Err(err.into());
        }
        Ok(())
    }

    /// Patch the status of the Release.
    async fn patch_release_status<F>(&mut self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Release) + Send,
    {
        let original = self.release.clone();
        let precondition = Precondition::merge_from(&original);
        mutate(&mut self.release);
        if let Err(err) = self.store.patch_status(&mut self.release, precondition).await {
            self.release = original;
            return Err(err.into());
        }
        Ok(())
    }

    /// Mark the Release invalid with `reason` and the error's message.
    async fn mark_release_invalid(&mut self, reason: ReleaseReason, err: &ReleaseError) -> Result<()> {
        let message = err.to_string();
        let logged = message.clone();
        self.patch_release_status(move |release| release.mark_invalid(reason, message))
            .await?;
        METRICS.inc_validation_failures();
        obs::emit_release_invalidated(&self.key(), reason.as_str(), &logged);
        Ok(())
    }

    /// Reject the Release for validation errors; requeue anything else.
    async fn reject_or_requeue(&mut self, reason: ReleaseReason, err: ReleaseError) -> OperationResult {
        if !err.is_validation() {
            return OperationResult::requeue_on_error(err);
        }
        OperationResult::requeue_on_error_or_stop(self.mark_release_invalid(reason, &err).await)
    }

    async fn get_release_plan(&self) -> Result<ReleasePlan> {
        let key = NamespacedName::new(
            &self.release.metadata.namespace,
            &self.release.spec.release_plan,
        );
        Ok(self.store.get(&key).await?)
    }

    async fn get_active_admission(&self) -> Result<ReleasePlanAdmission> {
        let plan = self.get_release_plan().await?;
        resolve_active_admission(self.store.as_ref(), &plan).await
    }

    async fn get_snapshot(&self) -> Result<Snapshot> {
        let key = NamespacedName::new(&self.release.metadata.namespace, &self.release.spec.snapshot);
        Ok(self.store.get(&key).await?)
    }

    /// Find the pipeline run labelled for this Release, if any.
    async fn get_release_pipeline_run(&self) -> Result<Option<PipelineRun>> {
        let params = ListParams::default()
            .matching_label(RELEASE_NAME_LABEL, self.release.metadata.name.as_str())
            .matching_label(RELEASE_NAMESPACE_LABEL, self.release.metadata.namespace.as_str())
            .limit(1);
        let runs: Vec<PipelineRun> = self.store.list(&params).await?;
        debug!(release = %self.key(), found = !runs.is_empty(), "looked up release pipeline run");
        Ok(runs.into_iter().next())
    }
}
