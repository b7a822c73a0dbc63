//! Release pipeline run: admission gating, creation and tracking.

use chrono::Utc;
use release_store::{NamespacedName, TypedStore};
use tracing::debug;

use super::ReleaseAdapter;
use crate::domain::{
    EnterpriseContractPolicy, PipelineRun, ReleaseError, ReleasePlanAdmission, ReleaseReason,
    ReleaseStrategy, Result, Snapshot,
};
use crate::metrics::METRICS;
use crate::obs;
use crate::operation::OperationResult;
use crate::pipeline_run_builder::{ReleasePipelineRunBuilder, RELEASE_PIPELINE_RUN_PREFIX};

impl ReleaseAdapter {
    /// Stop the chain when the admission is ambiguous or opted out.
    ///
    /// Any other resolution failure continues, so later operations can report
    /// it with a more specific reason.
    pub async fn ensure_admission_enabled(&mut self) -> OperationResult {
        let err = match self.get_active_admission().await {
            Err(err) if err.is_admission_rejection() => err,
            _ => return OperationResult::continue_processing(),
        };

        let reason = match err {
            ReleaseError::AutoReleaseDisabled { .. } => ReleaseReason::TargetDisabledError,
            _ => ReleaseReason::ReleaseValidationError,
        };
        OperationResult::requeue_on_error_or_stop(self.mark_release_invalid(reason, &err).await)
    }

    /// Create the release pipeline run unless one is already labelled for
    /// this Release, then record it in status and mark the Release running.
    ///
    /// A Release that already reached a terminal state is left alone, even
    /// when it was rejected before any run existed and the missing object
    /// has since appeared.
    pub async fn ensure_pipeline_run_exists(&mut self) -> OperationResult {
        if self.release.is_done() {
            return OperationResult::continue_processing();
        }

        let existing = match self.get_release_pipeline_run().await {
            Ok(existing) => existing,
            Err(err) => return OperationResult::requeue_on_error(err),
        };

        let (pipeline_run, strategy) = match existing {
            Some(_) if self.release.status.release_pipeline_run.is_some() => {
                return OperationResult::continue_processing();
            }
            Some(pipeline_run) => {
                // Created by a pass that never got to record it.
                let strategy = match self.resolve_strategy().await {
                    Ok(strategy) => strategy,
                    Err(err) if err.is_validation() => {
                        debug!(release = %self.key(), error = %err, "cannot register existing pipeline run");
                        return OperationResult::continue_processing();
                    }
                    Err(err) => return OperationResult::requeue_on_error(err),
                };
                (pipeline_run, strategy)
            }
            None => {
                let admission = match self.get_active_admission().await {
                    Ok(admission) => admission,
                    Err(err) => {
                        return self
                            .reject_or_requeue(ReleaseReason::ReleasePlanValidationError, err)
                            .await
                    }
                };
                let strategy = match self.get_release_strategy(&admission).await {
                    Ok(strategy) => strategy,
                    Err(err) => {
                        return self
                            .reject_or_requeue(ReleaseReason::ReleaseValidationError, err)
                            .await
                    }
                };
                let policy = match self.get_enterprise_contract_policy(&strategy).await {
                    Ok(policy) => policy,
                    Err(err) => {
                        return self
                            .reject_or_requeue(ReleaseReason::ReleaseValidationError, err)
                            .await
                    }
                };
                let snapshot = match self.get_snapshot().await {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        return self
                            .reject_or_requeue(ReleaseReason::ReleaseValidationError, err)
                            .await
                    }
                };

                match self
                    .create_release_pipeline_run(&strategy, &policy, &snapshot)
                    .await
                {
                    Ok(pipeline_run) => (pipeline_run, strategy),
                    Err(err) => return OperationResult::requeue_on_error(err),
                }
            }
        };

        OperationResult::requeue_on_error_or_continue(
            self.register_release_status_data(&pipeline_run, &strategy)
                .await,
        )
    }

    /// Project a finished pipeline run onto the Release.
    pub async fn ensure_pipeline_run_tracked(&mut self) -> OperationResult {
        if !self.release.has_started() || self.release.is_done() {
            return OperationResult::continue_processing();
        }

        match self.get_release_pipeline_run().await {
            Ok(Some(pipeline_run)) => OperationResult::requeue_on_error_or_continue(
                self.register_release_pipeline_run_status(&pipeline_run)
                    .await,
            ),
            Ok(None) => OperationResult::continue_processing(),
            Err(err) => OperationResult::requeue_on_error(err),
        }
    }

    async fn resolve_strategy(&self) -> Result<ReleaseStrategy> {
        let admission = self.get_active_admission().await?;
        self.get_release_strategy(&admission).await
    }

    async fn get_release_strategy(&self, admission: &ReleasePlanAdmission) -> Result<ReleaseStrategy> {
        if admission.spec.release_strategy.is_empty() {
            return Err(ReleaseError::MissingStrategyReference {
                admission: admission.metadata.key().to_string(),
            });
        }
        let key = NamespacedName::new(
            &admission.metadata.namespace,
            &admission.spec.release_strategy,
        );
        Ok(self.store.get(&key).await?)
    }

    async fn get_enterprise_contract_policy(
        &self,
        strategy: &ReleaseStrategy,
    ) -> Result<EnterpriseContractPolicy> {
        let key = NamespacedName::new(&strategy.metadata.namespace, &strategy.spec.policy);
        Ok(self.store.get(&key).await?)
    }

    async fn create_release_pipeline_run(
        &self,
        strategy: &ReleaseStrategy,
        policy: &EnterpriseContractPolicy,
        snapshot: &Snapshot,
    ) -> Result<PipelineRun> {
        let mut pipeline_run =
            ReleasePipelineRunBuilder::new(RELEASE_PIPELINE_RUN_PREFIX, &strategy.metadata.namespace)
                .with_owner(&self.release)
                .with_release_and_application_metadata(&self.release, &snapshot.spec.application)
                .with_release_strategy(strategy)
                .with_enterprise_contract_policy(policy)?
                .with_snapshot(snapshot)?
                .build();

        self.store.create(&mut pipeline_run).await?;

        METRICS.inc_pipeline_runs_created();
        obs::emit_pipeline_run_created(&self.key(), &pipeline_run.metadata.key());
        Ok(pipeline_run)
    }

    async fn register_release_status_data(
        &mut self,
        pipeline_run: &PipelineRun,
        strategy: &ReleaseStrategy,
    ) -> Result<()> {
        let pipeline_run_ref = pipeline_run.metadata.key().to_string();
        let strategy_ref = strategy.metadata.key().to_string();
        let target = pipeline_run.metadata.namespace.clone();

        self.patch_release_status(move |release| {
            release.status.release_pipeline_run = Some(pipeline_run_ref);
            release.status.release_strategy = Some(strategy_ref);
            release.status.target = Some(target);
            release.mark_running();
        })
        .await
    }

    async fn register_release_pipeline_run_status(&mut self, pipeline_run: &PipelineRun) -> Result<()> {
        let condition = match pipeline_run.succeeded_condition() {
            Some(condition) if !condition.is_unknown() => condition.clone(),
            _ => return Ok(()),
        };
        let succeeded = condition.is_true();

        self.patch_release_status(move |release| {
            release.status.completion_time = Some(Utc::now());
            if succeeded {
                release.mark_succeeded();
            } else {
                release.mark_failed(ReleaseReason::PipelineFailed, condition.message);
            }
        })
        .await?;

        obs::emit_release_completed(&self.key(), succeeded);
        Ok(())
    }
}
