//! Object identity and metadata shared by every resource kind.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator between namespace and name in serialized references.
pub const SEPARATOR: char = '/';

/// Error returned when a serialized `namespace/name` reference is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid namespaced name '{value}': expected '<namespace>/<name>'")]
pub struct InvalidNamespacedName {
    pub value: String,
}

/// Namespace-scoped identity of an object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse a `namespace/name` string.
    ///
    /// Exactly one separator and two non-empty parts are accepted.
    pub fn parse(value: &str) -> Result<Self, InvalidNamespacedName> {
        let parts: Vec<&str> = value.split(SEPARATOR).collect();
        match parts.as_slice() {
            [namespace, name] if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(*namespace, *name))
            }
            _ => Err(InvalidNamespacedName {
                value: value.to_string(),
            }),
        }
    }
}

impl FromStr for NamespacedName {
    type Err = InvalidNamespacedName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, SEPARATOR, self.name)
    }
}

/// Reference from an owned object to the object controlling its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    pub uid: String,
    #[serde(default)]
    pub controller: bool,
    #[serde(default)]
    pub block_owner_deletion: bool,
}

/// Metadata carried by every stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,

    /// Prefix used by the store to generate `name` when it is empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub generate_name: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,

    /// Monotonic version assigned by the store on every write.
    #[serde(default)]
    pub resource_version: u64,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,

    /// Set by the store when deletion was requested but finalizers remain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Metadata for an object whose name the store will generate.
    pub fn generated(namespace: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            generate_name: prefix.into(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> NamespacedName {
        NamespacedName::new(&self.namespace, &self.name)
    }

    pub fn is_being_deleted(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.iter().any(|f| f == finalizer)
    }

    /// Add a finalizer, returning `true` if the set changed.
    pub fn add_finalizer(&mut self, finalizer: &str) -> bool {
        if self.has_finalizer(finalizer) {
            return false;
        }
        self.finalizers.push(finalizer.to_string());
        true
    }

    /// Remove a finalizer, returning `true` if the set changed.
    pub fn remove_finalizer(&mut self, finalizer: &str) -> bool {
        let before = self.finalizers.len();
        self.finalizers.retain(|f| f != finalizer);
        before != self.finalizers.len()
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaced_name_round_trips_through_display() {
        let key = NamespacedName::new("managed", "binding-x1y2z");
        let parsed: NamespacedName = key.to_string().parse().expect("parse");
        assert_eq!(parsed, key);
        assert_eq!(key.to_string(), "managed/binding-x1y2z");
    }

    #[test]
    fn namespaced_name_rejects_malformed_values() {
        for bad in ["", "no-separator", "a/b/c", "/name", "namespace/"] {
            let err = NamespacedName::parse(bad).unwrap_err();
            assert_eq!(err.value, bad);
            assert!(err.to_string().contains("expected '<namespace>/<name>'"));
        }
    }

    #[test]
    fn finalizer_helpers_report_changes() {
        let mut meta = ObjectMeta::new("tenant", "release-a");
        assert!(meta.add_finalizer("example.io/finalizer"));
        assert!(!meta.add_finalizer("example.io/finalizer"));
        assert!(meta.has_finalizer("example.io/finalizer"));
        assert!(meta.remove_finalizer("example.io/finalizer"));
        assert!(!meta.remove_finalizer("example.io/finalizer"));
        assert!(meta.finalizers.is_empty());
    }

    #[test]
    fn empty_collections_are_not_serialized() {
        let meta = ObjectMeta::new("tenant", "release-a");
        let json = serde_json::to_value(&meta).expect("serialize");
        assert!(json.get("labels").is_none());
        assert!(json.get("finalizers").is_none());
        assert_eq!(json["namespace"], "tenant");
    }
}
