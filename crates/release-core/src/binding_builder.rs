//! Construction of SnapshotEnvironmentBindings.

use release_store::ObjectMeta;

use crate::domain::binding::{BindingSpec, BindingStatus};
use crate::domain::{
    BindingComponent, BindingComponentConfiguration, Component, Environment, Snapshot,
    SnapshotEnvironmentBinding,
};

const DEFAULT_REPLICAS: u32 = 1;

/// Binding that deploys `snapshot` into `environment`, one entry per component.
///
/// The binding lives in the environment's namespace and its name is generated
/// from `<application>-<environment>-binding-`.
pub fn new_snapshot_environment_binding(
    components: &[Component],
    snapshot: &Snapshot,
    environment: &Environment,
) -> SnapshotEnvironmentBinding {
    let application = &snapshot.spec.application;
    let prefix = format!("{}-{}-binding-", application, environment.metadata.name);

    SnapshotEnvironmentBinding {
        metadata: ObjectMeta::generated(&environment.metadata.namespace, prefix),
        spec: BindingSpec {
            application: application.clone(),
            environment: environment.metadata.name.clone(),
            snapshot: snapshot.metadata.name.clone(),
            components: components
                .iter()
                .map(|component| BindingComponent {
                    name: component.metadata.name.clone(),
                    configuration: BindingComponentConfiguration {
                        replicas: component.spec.replicas.unwrap_or(DEFAULT_REPLICAS),
                    },
                })
                .collect(),
        },
        status: BindingStatus::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_covers_every_component() {
        let mut scaled = Component::new("managed", "worker", "app");
        scaled.spec.replicas = Some(3);
        let components = vec![Component::new("managed", "api", "app"), scaled];
        let snapshot = Snapshot::new("managed", "snap", "app");
        let environment = Environment::new("managed", "prod");

        let binding = new_snapshot_environment_binding(&components, &snapshot, &environment);

        assert_eq!(binding.metadata.namespace, "managed");
        assert_eq!(binding.metadata.generate_name, "app-prod-binding-");
        assert_eq!(binding.spec.environment, "prod");
        assert_eq!(binding.spec.snapshot, "snap");
        assert_eq!(binding.spec.components.len(), 2);
        assert_eq!(binding.spec.components[0].configuration.replicas, 1);
        assert_eq!(binding.spec.components[1].configuration.replicas, 3);
    }
}
