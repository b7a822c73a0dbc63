//! Cleanup-before-delete.

use release_store::TypedStore;
use tracing::{debug, info};

use super::ReleaseAdapter;
use crate::domain::{PipelineRun, Result, RELEASE_FINALIZER};
use crate::obs;
use crate::operation::OperationResult;

impl ReleaseAdapter {
    /// Run cleanup for a Release marked for deletion, then drop the finalizer.
    ///
    /// Always ends the pass once deletion is in progress. Cleanup followed by
    /// finalizer removal requeues so the store can finish the delete, and a
    /// failure in either keeps the finalizer and requeues with the error.
    /// A Release still held by other finalizers after ours is gone stops
    /// instead, so it is not polled until their owners release it.
    pub async fn ensure_finalizer_called(&mut self) -> OperationResult {
        let meta = &self.release.metadata;
        if !meta.is_being_deleted() {
            return OperationResult::continue_processing();
        }

        if !meta.has_finalizer(RELEASE_FINALIZER) {
            if meta.finalizers.is_empty() {
                return OperationResult::requeue();
            }
            debug!(release = %self.key(), finalizers = ?meta.finalizers, "release held by other finalizers");
            return OperationResult::stop();
        }

        if let Err(err) = self.finalize_release().await {
            return OperationResult::requeue_on_error(err);
        }

        let removed = self
            .patch_release(|release| {
                release.metadata.remove_finalizer(RELEASE_FINALIZER);
            })
            .await;
        if let Err(err) = removed {
            return OperationResult::requeue_on_error(err);
        }
        obs::emit_release_finalized(&self.key());

        OperationResult::requeue()
    }

    /// Add the finalizer to a live Release that lacks it.
    pub async fn ensure_finalizer_present(&mut self) -> OperationResult {
        let meta = &self.release.metadata;
        if meta.is_being_deleted() || meta.has_finalizer(RELEASE_FINALIZER) {
            return OperationResult::continue_processing();
        }

        info!(release = %self.key(), "adding finalizer to release");
        let added = self
            .patch_release(|release| {
                release.metadata.add_finalizer(RELEASE_FINALIZER);
            })
            .await;
        OperationResult::requeue_on_error_or_continue(added)
    }

    /// Delete the release pipeline run, if one exists.
    async fn finalize_release(&self) -> Result<()> {
        if let Some(pipeline_run) = self.get_release_pipeline_run().await? {
            let key = pipeline_run.metadata.key();
            if self.store.delete_if_exists::<PipelineRun>(&key).await? {
                info!(release = %self.key(), pipeline_run = %key, "deleted release pipeline run");
            }
        }
        Ok(())
    }
}
