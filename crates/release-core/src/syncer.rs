//! Mirrors snapshots into the namespace a deployment runs in.

use std::sync::Arc;

use async_trait::async_trait;
use release_store::{ObjectMeta, ResourceStore, StoreError, TypedStore};
use tracing::{debug, info};

use crate::domain::{ReleaseError, Result, Snapshot};

/// Copies objects a deployment references across namespace boundaries.
#[async_trait]
pub trait SnapshotSyncer: Send + Sync {
    /// Ensure a copy of `snapshot` exists in `namespace`.
    async fn sync_snapshot(&self, snapshot: &Snapshot, namespace: &str) -> Result<()>;
}

/// Syncer writing copies through a [`ResourceStore`].
pub struct StoreSnapshotSyncer {
    store: Arc<dyn ResourceStore>,
}

impl StoreSnapshotSyncer {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SnapshotSyncer for StoreSnapshotSyncer {
    async fn sync_snapshot(&self, snapshot: &Snapshot, namespace: &str) -> Result<()> {
        if snapshot.metadata.namespace == namespace {
            return Ok(());
        }

        // Identity, versioning and ownership belong to the source object.
        let mut copy = Snapshot {
            metadata: ObjectMeta {
                labels: snapshot.metadata.labels.clone(),
                annotations: snapshot.metadata.annotations.clone(),
                ..ObjectMeta::new(namespace, &snapshot.metadata.name)
            },
            spec: snapshot.spec.clone(),
        };

        match self.store.create(&mut copy).await {
            Ok(()) => {
                info!(snapshot = %snapshot.metadata.key(), target = %namespace, "snapshot synced");
                Ok(())
            }
            Err(StoreError::AlreadyExists { .. }) => {
                debug!(snapshot = %snapshot.metadata.key(), target = %namespace, "snapshot already synced");
                Ok(())
            }
            Err(err) => Err(ReleaseError::SnapshotSync(format!(
                "copying snapshot '{}' into namespace '{}': {}",
                snapshot.metadata.key(),
                namespace,
                err
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use release_store::fakes::{MemoryResourceStore, StoreOperation};
    use release_store::NamespacedName;

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new("tenant", "snap", "app").with_component("api", "img@sha256:1");
        snapshot.metadata.uid = "source-uid".to_string();
        snapshot.metadata.resource_version = 7;
        snapshot
    }

    #[tokio::test]
    async fn copies_snapshot_into_target() {
        let store = Arc::new(MemoryResourceStore::new());
        let syncer = StoreSnapshotSyncer::new(store.clone());

        syncer.sync_snapshot(&snapshot(), "managed").await.unwrap();

        let copy: Snapshot = store
            .get(&NamespacedName::new("managed", "snap"))
            .await
            .unwrap();
        assert_eq!(copy.spec, snapshot().spec);
        assert_ne!(copy.metadata.uid, "source-uid");
    }

    #[tokio::test]
    async fn existing_copy_is_accepted() {
        let store = Arc::new(MemoryResourceStore::new());
        let syncer = StoreSnapshotSyncer::new(store.clone());

        syncer.sync_snapshot(&snapshot(), "managed").await.unwrap();
        syncer.sync_snapshot(&snapshot(), "managed").await.unwrap();

        assert_eq!(store.count("Snapshot"), 1);
    }

    #[tokio::test]
    async fn same_namespace_is_a_no_op() {
        let store = Arc::new(MemoryResourceStore::new());
        let syncer = StoreSnapshotSyncer::new(store.clone());

        syncer.sync_snapshot(&snapshot(), "tenant").await.unwrap();

        assert_eq!(store.count("Snapshot"), 0);
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let store = Arc::new(MemoryResourceStore::new());
        store.fail_next(
            StoreOperation::Create,
            "Snapshot",
            StoreError::Unavailable("timeout".to_string()),
        );
        let syncer = StoreSnapshotSyncer::new(store.clone());

        let err = syncer.sync_snapshot(&snapshot(), "managed").await.unwrap_err();
        assert!(matches!(err, ReleaseError::SnapshotSync(_)));
    }
}
