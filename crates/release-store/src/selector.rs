//! List options: namespace scoping, label and field selectors, limits.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::resource::DynamicObject;

/// Options for a `list` call. All selectors are equality matches and are
/// combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    /// Restrict to one namespace; `None` lists across all namespaces.
    pub namespace: Option<String>,
    pub labels: BTreeMap<String, String>,
    /// Dotted field paths (e.g. `spec.origin`) that must equal a string.
    pub fields: BTreeMap<String, String>,
    pub limit: Option<usize>,
}

impl ListParams {
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn matching_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn matching_field(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(path.into(), value.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `object` satisfies the namespace and selector constraints.
    /// The limit is applied by the caller.
    pub fn matches(&self, object: &DynamicObject) -> bool {
        if let Some(namespace) = &self.namespace {
            if &object.metadata.namespace != namespace {
                return false;
            }
        }

        let labels_match = self
            .labels
            .iter()
            .all(|(k, v)| object.metadata.label(k) == Some(v.as_str()));
        if !labels_match {
            return false;
        }

        self.fields.iter().all(|(path, expected)| {
            matches!(object.field(path), Some(Value::String(actual)) if &actual == expected)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::ObjectMeta;
    use serde_json::{json, Map};

    fn object(namespace: &str, labels: &[(&str, &str)], origin: &str) -> DynamicObject {
        let mut meta = ObjectMeta::new(namespace, "obj");
        for (k, v) in labels {
            meta.labels.insert(k.to_string(), v.to_string());
        }
        let mut data = Map::new();
        data.insert("spec".to_string(), json!({ "origin": origin }));
        DynamicObject::new("Thing", meta, data)
    }

    #[test]
    fn empty_params_match_everything() {
        assert!(ListParams::default().matches(&object("a", &[], "x")));
    }

    #[test]
    fn namespace_label_and_field_are_anded() {
        let params = ListParams::default()
            .in_namespace("managed")
            .matching_label("tier", "gold")
            .matching_field("spec.origin", "tenant");

        assert!(params.matches(&object("managed", &[("tier", "gold")], "tenant")));
        assert!(!params.matches(&object("other", &[("tier", "gold")], "tenant")));
        assert!(!params.matches(&object("managed", &[("tier", "silver")], "tenant")));
        assert!(!params.matches(&object("managed", &[("tier", "gold")], "elsewhere")));
    }

    #[test]
    fn field_selector_requires_string_value() {
        let params = ListParams::default().matching_field("spec.missing", "x");
        assert!(!params.matches(&object("a", &[], "x")));
    }
}
