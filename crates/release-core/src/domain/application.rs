//! Descriptive resources: applications, their components, snapshots and environments.

use release_store::ObjectMeta;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Application {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ApplicationSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    #[serde(default)]
    pub display_name: String,
}

impl Application {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let metadata = ObjectMeta::new(namespace, name);
        let display_name = metadata.name.clone();
        Self {
            metadata,
            spec: ApplicationSpec { display_name },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Component {
    pub metadata: ObjectMeta,
    pub spec: ComponentSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub application: String,
    #[serde(default)]
    pub container_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
}

impl Component {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        application: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: ComponentSpec {
                application: application.into(),
                container_image: String::new(),
                replicas: None,
            },
        }
    }
}

/// Immutable set of component images for an application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub metadata: ObjectMeta,
    pub spec: SnapshotSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSpec {
    pub application: String,
    #[serde(default)]
    pub components: Vec<SnapshotComponent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotComponent {
    pub name: String,
    pub container_image: String,
}

impl Snapshot {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        application: impl Into<String>,
    ) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: SnapshotSpec {
                application: application.into(),
                components: Vec::new(),
            },
        }
    }

    pub fn with_component(mut self, name: impl Into<String>, image: impl Into<String>) -> Self {
        self.spec.components.push(SnapshotComponent {
            name: name.into(),
            container_image: image.into(),
        });
        self
    }
}

/// Deployment target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Environment {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: EnvironmentSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSpec {
    #[serde(default)]
    pub display_name: String,
}

impl Environment {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let metadata = ObjectMeta::new(namespace, name);
        let display_name = metadata.name.clone();
        Self {
            metadata,
            spec: EnvironmentSpec { display_name },
        }
    }
}
