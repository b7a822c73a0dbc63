//! Typed resources and their untyped wire form.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::meta::{NamespacedName, ObjectMeta};
use crate::storage_traits::StoreResult;

/// A kind of object persisted in the resource store.
///
/// Implementors serialize as `{ "metadata": ..., "spec": ..., "status": ... }`
/// so the store can split metadata and status from the rest of the body.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Kind name used to partition the store.
    const KIND: &'static str;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> NamespacedName {
        self.meta().key()
    }
}

/// Untyped object as held by a store backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicObject {
    pub kind: String,
    pub metadata: ObjectMeta,
    /// Everything except `metadata` (typically `spec` and `status`).
    pub data: Map<String, Value>,
}

impl DynamicObject {
    pub fn new(kind: impl Into<String>, metadata: ObjectMeta, data: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            metadata,
            data,
        }
    }

    /// Convert a typed resource into its wire form.
    pub fn from_resource<K: Resource>(resource: &K) -> StoreResult<Self> {
        match serde_json::to_value(resource)? {
            Value::Object(mut data) => {
                let metadata = match data.remove("metadata") {
                    Some(value) => serde_json::from_value(value)?,
                    None => ObjectMeta::default(),
                };
                Ok(Self::new(K::KIND, metadata, data))
            }
            other => Err(StoreError::Serialization(format!(
                "{} did not serialize to an object: {}",
                K::KIND,
                other
            ))),
        }
    }

    /// Convert back into a typed resource.
    pub fn into_resource<K: Resource>(self) -> StoreResult<K> {
        if self.kind != K::KIND {
            return Err(StoreError::Serialization(format!(
                "expected kind {}, found {}",
                K::KIND,
                self.kind
            )));
        }
        let mut data = self.data;
        data.insert("metadata".to_string(), serde_json::to_value(&self.metadata)?);
        Ok(serde_json::from_value(Value::Object(data))?)
    }

    pub fn key(&self) -> NamespacedName {
        self.metadata.key()
    }

    pub fn status(&self) -> Option<&Value> {
        self.data.get("status")
    }

    /// Look up a dotted field path such as `spec.origin` or `metadata.name`.
    pub fn field(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = if first == "metadata" {
            serde_json::to_value(&self.metadata).ok()?
        } else {
            self.data.get(first)?.clone()
        };
        for segment in segments {
            current = current.get(segment)?.clone();
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        metadata: ObjectMeta,
        spec: WidgetSpec,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct WidgetSpec {
        color: String,
    }

    impl Resource for Widget {
        const KIND: &'static str = "Widget";

        fn meta(&self) -> &ObjectMeta {
            &self.metadata
        }

        fn meta_mut(&mut self) -> &mut ObjectMeta {
            &mut self.metadata
        }
    }

    fn widget() -> Widget {
        Widget {
            metadata: ObjectMeta::new("tenant", "w1"),
            spec: WidgetSpec {
                color: "blue".to_string(),
            },
        }
    }

    #[test]
    fn dynamic_object_splits_metadata_from_body() {
        let obj = DynamicObject::from_resource(&widget()).expect("to dynamic");
        assert_eq!(obj.kind, "Widget");
        assert_eq!(obj.metadata.name, "w1");
        assert!(obj.data.get("metadata").is_none());
        assert_eq!(obj.data["spec"], json!({"color": "blue"}));

        let back: Widget = obj.into_resource().expect("to typed");
        assert_eq!(back, widget());
    }

    #[test]
    fn field_resolves_metadata_and_body_paths() {
        let obj = DynamicObject::from_resource(&widget()).expect("to dynamic");
        assert_eq!(obj.field("spec.color"), Some(json!("blue")));
        assert_eq!(obj.field("metadata.namespace"), Some(json!("tenant")));
        assert_eq!(obj.field("spec.missing"), None);
    }

    #[test]
    fn into_resource_rejects_kind_mismatch() {
        let mut obj = DynamicObject::from_resource(&widget()).expect("to dynamic");
        obj.kind = "Gadget".to_string();
        let err = obj.into_resource::<Widget>().unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
