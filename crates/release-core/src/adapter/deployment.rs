//! Deployment binding: creation and tracking.

use release_store::{ListParams, NamespacedName, Resource, TypedStore};
use tracing::debug;

use super::ReleaseAdapter;
use crate::binding_builder::new_snapshot_environment_binding;
use crate::domain::{
    Application, Component, Environment, ReleaseError, ReleasePlanAdmission, Result,
    SnapshotEnvironmentBinding, ENVIRONMENT_FIELD,
};
use crate::metrics::METRICS;
use crate::obs;
use crate::operation::OperationResult;
use crate::ownership::{set_controller_reference, set_owner_annotations};

/// Indexed field holding a component's application name.
const APPLICATION_FIELD: &str = "spec.application";

impl ReleaseAdapter {
    /// Create the deployment binding for a succeeded Release whose admission
    /// names an environment, and record its reference in status.
    ///
    /// A binding is shared by every Release of the application deploying into
    /// the environment. Its owner annotations name only the Release that
    /// created it, so binding changes wake that Release directly while the
    /// others see deployment progress on their next resync pass.
    pub async fn ensure_binding_exists(&mut self) -> OperationResult {
        if !self.release.has_succeeded() || self.release.has_been_deployed() {
            return OperationResult::continue_processing();
        }

        let admission = match self.get_active_admission().await {
            Ok(admission) => admission,
            Err(err) => return OperationResult::requeue_on_error(err),
        };

        let environment_name = match admission.spec.environment.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                debug!(release = %self.key(), "admission declares no environment, skipping deployment");
                return OperationResult::continue_processing();
            }
        };

        let environment_key = NamespacedName::new(&admission.metadata.namespace, environment_name);
        let environment: Environment = match self.store.get(&environment_key).await {
            Ok(environment) => environment,
            Err(err) => return OperationResult::requeue_on_error(err),
        };

        let existing = match self
            .get_snapshot_environment_binding(&environment, &admission)
            .await
        {
            Ok(existing) => existing,
            Err(err) => return OperationResult::requeue_on_error(err),
        };

        let binding = match existing {
            Some(binding) => binding,
            None => {
                if let Err(err) = self.sync_resources(&admission).await {
                    return OperationResult::requeue_on_error(err);
                }
                match self
                    .create_snapshot_environment_binding(&environment, &admission)
                    .await
                {
                    Ok(binding) => binding,
                    Err(err) => return OperationResult::requeue_on_error(err),
                }
            }
        };

        let reference = binding.metadata.key().to_string();
        if self.release.status.snapshot_environment_binding.as_deref() == Some(reference.as_str()) {
            return OperationResult::continue_processing();
        }
        OperationResult::requeue_on_error_or_continue(
            self.patch_release_status(move |release| {
                release.status.snapshot_environment_binding = Some(reference);
            })
            .await,
        )
    }

    /// Project the binding's deployment condition onto the Release.
    pub async fn ensure_binding_tracked(&mut self) -> OperationResult {
        if !self.release.has_succeeded() || self.release.has_been_deployed() {
            return OperationResult::continue_processing();
        }
        let reference = match self.release.status.snapshot_environment_binding.as_deref() {
            Some(reference) if !reference.is_empty() => reference.to_string(),
            _ => return OperationResult::continue_processing(),
        };

        let key = match NamespacedName::parse(&reference) {
            Ok(key) => key,
            Err(source) => {
                return OperationResult::requeue_on_error(ReleaseError::InvalidReference {
                    kind: SnapshotEnvironmentBinding::KIND,
                    source,
                })
            }
        };

        match self.store.get::<SnapshotEnvironmentBinding>(&key).await {
            Ok(binding) => OperationResult::requeue_on_error_or_continue(
                self.register_deployment_status(&binding).await,
            ),
            Err(err) => OperationResult::requeue_on_error(err),
        }
    }

    /// Binding in the environment's namespace for the admission's application.
    async fn get_snapshot_environment_binding(
        &self,
        environment: &Environment,
        admission: &ReleasePlanAdmission,
    ) -> Result<Option<SnapshotEnvironmentBinding>> {
        let params = ListParams::default()
            .in_namespace(environment.metadata.namespace.as_str())
            .matching_field(ENVIRONMENT_FIELD, environment.metadata.name.as_str());
        let bindings: Vec<SnapshotEnvironmentBinding> = self.store.list(&params).await?;
        Ok(bindings
            .into_iter()
            .find(|binding| binding.spec.application == admission.spec.application))
    }

    /// Mirror the Release's snapshot into the admission's namespace.
    async fn sync_resources(&self, admission: &ReleasePlanAdmission) -> Result<()> {
        let snapshot = self.get_snapshot().await?;
        self.syncer
            .sync_snapshot(&snapshot, &admission.metadata.namespace)
            .await
    }

    async fn create_snapshot_environment_binding(
        &self,
        environment: &Environment,
        admission: &ReleasePlanAdmission,
    ) -> Result<SnapshotEnvironmentBinding> {
        let application_key =
            NamespacedName::new(&admission.metadata.namespace, &admission.spec.application);
        let application: Application = self.store.get(&application_key).await?;

        let params = ListParams::default()
            .in_namespace(application.metadata.namespace.as_str())
            .matching_field(APPLICATION_FIELD, application.metadata.name.as_str());
        let components: Vec<Component> = self.store.list(&params).await?;

        let snapshot = self.get_snapshot().await?;

        let mut binding = new_snapshot_environment_binding(&components, &snapshot, environment);
        set_controller_reference(&application, &mut binding)?;
        set_owner_annotations(&self.release, &mut binding);

        self.store.create(&mut binding).await?;

        METRICS.inc_bindings_created();
        obs::emit_binding_created(&self.key(), &binding.metadata.key());
        Ok(binding)
    }

    async fn register_deployment_status(&mut self, binding: &SnapshotEnvironmentBinding) -> Result<()> {
        let condition = match binding.deployment_condition() {
            Some(condition) => condition.clone(),
            None => return Ok(()),
        };
        let status = format!("{:?}", condition.status);
        let reason = condition.reason.clone();

        self.patch_release_status(move |release| {
            if condition.is_unknown() {
                release.mark_deploying(condition.reason, condition.message);
            } else {
                release.mark_deployed(condition.status, condition.reason, condition.message);
            }
        })
        .await?;

        obs::emit_deployment_status_changed(&self.key(), &status, &reason);
        Ok(())
    }
}
