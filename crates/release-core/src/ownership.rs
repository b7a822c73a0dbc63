//! Owner references and owner annotations.
//!
//! Owner references tie an object's lifetime to a same-namespace controller.
//! Owner annotations work across namespaces: they let a watcher map a change
//! on an owned object back to the Release that created it.

use release_store::{NamespacedName, ObjectMeta, OwnerReference, Resource};
use tracing::debug;

use crate::domain::{ReleaseError, Result};

/// `namespace/name` of the owning object.
pub const OWNER_ANNOTATION: &str = "release.orchestrator.io/owner";

/// Kind of the owning object.
pub const OWNER_KIND_ANNOTATION: &str = "release.orchestrator.io/owner-kind";

/// Annotate `owned` with a back-reference to `owner`.
pub fn set_owner_annotations<O: Resource, T: Resource>(owner: &O, owned: &mut T) {
    let annotations = &mut owned.meta_mut().annotations;
    annotations.insert(OWNER_ANNOTATION.to_string(), owner.key().to_string());
    annotations.insert(OWNER_KIND_ANNOTATION.to_string(), O::KIND.to_string());
}

/// Read back the owner of kind `kind` recorded by [`set_owner_annotations`].
pub fn owner_from_annotations(meta: &ObjectMeta, kind: &str) -> Option<NamespacedName> {
    if meta.annotation(OWNER_KIND_ANNOTATION)? != kind {
        return None;
    }
    let value = meta.annotation(OWNER_ANNOTATION)?;
    match NamespacedName::parse(value) {
        Ok(owner) => Some(owner),
        Err(err) => {
            debug!(object = %meta.key(), error = %err, "ignoring malformed owner annotation");
            None
        }
    }
}

/// Make `owner` the controller of `owned`.
///
/// Both objects must live in the same namespace, and `owned` must not
/// already be controlled by a different object.
pub fn set_controller_reference<O: Resource, T: Resource>(owner: &O, owned: &mut T) -> Result<()> {
    let owner_meta = owner.meta();
    let owned_meta = owned.meta_mut();

    if owner_meta.namespace != owned_meta.namespace {
        return Err(ReleaseError::Ownership(format!(
            "cross-namespace owner references are not allowed: {} '{}' cannot own an object in namespace '{}'",
            O::KIND,
            owner_meta.key(),
            owned_meta.namespace
        )));
    }

    let reference = OwnerReference {
        kind: O::KIND.to_string(),
        name: owner_meta.name.clone(),
        uid: owner_meta.uid.clone(),
        controller: true,
        block_owner_deletion: true,
    };

    if let Some(existing) = owned_meta
        .owner_references
        .iter()
        .find(|r| r.controller && (r.kind != reference.kind || r.name != reference.name))
    {
        return Err(ReleaseError::Ownership(format!(
            "object is already controlled by {} '{}'",
            existing.kind, existing.name
        )));
    }

    owned_meta
        .owner_references
        .retain(|r| !(r.kind == reference.kind && r.name == reference.name));
    owned_meta.owner_references.push(reference);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Application, Release, Snapshot};

    #[test]
    fn owner_annotations_round_trip() {
        let release = Release::new("tenant", "release-a", "plan", "snap");
        let mut snapshot = Snapshot::new("managed", "copy", "app");

        set_owner_annotations(&release, &mut snapshot);

        assert_eq!(
            owner_from_annotations(&snapshot.metadata, "Release"),
            Some(NamespacedName::new("tenant", "release-a"))
        );
        assert_eq!(owner_from_annotations(&snapshot.metadata, "Application"), None);
    }

    #[test]
    fn malformed_owner_annotation_is_ignored() {
        let mut snapshot = Snapshot::new("managed", "copy", "app");
        snapshot
            .metadata
            .annotations
            .insert(OWNER_ANNOTATION.to_string(), "garbage".to_string());
        snapshot
            .metadata
            .annotations
            .insert(OWNER_KIND_ANNOTATION.to_string(), "Release".to_string());

        assert_eq!(owner_from_annotations(&snapshot.metadata, "Release"), None);
    }

    #[test]
    fn controller_reference_is_namespace_scoped() {
        let app = Application::new("managed", "app");
        let mut local = Snapshot::new("managed", "s", "app");
        let mut remote = Snapshot::new("tenant", "s", "app");

        set_controller_reference(&app, &mut local).unwrap();
        assert_eq!(local.metadata.owner_references.len(), 1);
        assert!(local.metadata.owner_references[0].controller);

        let err = set_controller_reference(&app, &mut remote).unwrap_err();
        assert!(matches!(err, ReleaseError::Ownership(_)));
    }

    #[test]
    fn second_controller_is_refused() {
        let first = Application::new("managed", "first");
        let second = Application::new("managed", "second");
        let mut snapshot = Snapshot::new("managed", "s", "app");

        set_controller_reference(&first, &mut snapshot).unwrap();
        set_controller_reference(&first, &mut snapshot).unwrap();
        assert_eq!(snapshot.metadata.owner_references.len(), 1);

        assert!(set_controller_reference(&second, &mut snapshot).is_err());
    }
}
