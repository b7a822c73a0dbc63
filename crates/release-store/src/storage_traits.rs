//! Storage trait definitions for the release controller
//!
//! These traits define the resource store the controller talks to:
//! - `ResourceStore`: object-safe, untyped get/list/create/patch/delete
//! - `TypedStore`: typed convenience layer, implemented for every store
//!
//! All traits are async and backend-agnostic. An in-memory fake is provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::meta::NamespacedName;
use crate::resource::{DynamicObject, Resource};
use crate::selector::ListParams;

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Optimistic-concurrency guard for patches.
///
/// Captured from the object *before* it is mutated in memory; the store
/// rejects the patch with `StoreError::Conflict` if the stored version moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precondition {
    pub resource_version: u64,
}

impl Precondition {
    pub fn merge_from<K: Resource>(original: &K) -> Self {
        Self {
            resource_version: original.meta().resource_version,
        }
    }
}

/// Kind of change reported on a store's change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
}

/// A single change notification.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub event_type: WatchEventType,
    pub object: DynamicObject,
}

/// Namespace-scoped resource store.
///
/// Guarantees:
/// - Reads after writes are consistent within a namespace.
/// - `get_object` on a missing object returns `StoreError::NotFound`.
/// - `patch_object` / `patch_object_status` fail with `StoreError::Conflict` when the
///   precondition version is stale; the stored object is left untouched.
/// - `patch_object` never writes `status`; `patch_object_status` writes only
///   `status`.
/// - Deleting an object that still carries finalizers only stamps its
///   deletion timestamp; it is removed once the last finalizer is patched away.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch one object by kind and namespaced name.
    async fn get_object(&self, kind: &str, key: &NamespacedName) -> StoreResult<DynamicObject>;

    /// List objects of a kind matching `params`.
    async fn list_objects(&self, kind: &str, params: &ListParams)
        -> StoreResult<Vec<DynamicObject>>;

    /// Create an object, returning it with server-assigned fields filled in.
    async fn create_object(&self, object: DynamicObject) -> StoreResult<DynamicObject>;

    /// Write metadata and spec of an existing object.
    async fn patch_object(
        &self,
        object: DynamicObject,
        precondition: Precondition,
    ) -> StoreResult<DynamicObject>;

    /// Write the status of an existing object.
    async fn patch_object_status(
        &self,
        object: DynamicObject,
        precondition: Precondition,
    ) -> StoreResult<DynamicObject>;

    /// Request deletion of an object.
    async fn delete_object(&self, kind: &str, key: &NamespacedName) -> StoreResult<()>;

    /// Subscribe to the store's change feed, if the backend has one.
    fn watch(&self) -> Option<broadcast::Receiver<WatchEvent>> {
        None
    }
}

/// Typed access to a [`ResourceStore`].
///
/// Write operations update the caller's value in place with the stored
/// result (generated name, uid, resource version).
#[async_trait]
pub trait TypedStore {
    async fn get<K: Resource>(&self, key: &NamespacedName) -> StoreResult<K>;

    async fn list<K: Resource>(&self, params: &ListParams) -> StoreResult<Vec<K>>;

    async fn create<K: Resource>(&self, resource: &mut K) -> StoreResult<()>;

    async fn patch<K: Resource>(&self, resource: &mut K, precondition: Precondition)
        -> StoreResult<()>;

    async fn patch_status<K: Resource>(
        &self,
        resource: &mut K,
        precondition: Precondition,
    ) -> StoreResult<()>;

    async fn delete<K: Resource>(&self, key: &NamespacedName) -> StoreResult<()>;

    /// Delete if present. Returns whether an object was found.
    async fn delete_if_exists<K: Resource>(&self, key: &NamespacedName) -> StoreResult<bool>;
}

#[async_trait]
impl<S> TypedStore for S
where
    S: ResourceStore + ?Sized,
{
    async fn get<K: Resource>(&self, key: &NamespacedName) -> StoreResult<K> {
        self.get_object(K::KIND, key).await?.into_resource()
    }

    async fn list<K: Resource>(&self, params: &ListParams) -> StoreResult<Vec<K>> {
        self.list_objects(K::KIND, params)
            .await?
            .into_iter()
            .map(DynamicObject::into_resource::<K>)
            .collect()
    }

    async fn create<K: Resource>(&self, resource: &mut K) -> StoreResult<()> {
        let object = DynamicObject::from_resource(&*resource)?;
        *resource = self.create_object(object).await?.into_resource()?;
        Ok(())
    }

    async fn patch<K: Resource>(
        &self,
        resource: &mut K,
        precondition: Precondition,
    ) -> StoreResult<()> {
        let object = DynamicObject::from_resource(&*resource)?;
        let stored = self.patch_object(object, precondition).await?;
        *resource = stored.into_resource()?;
        Ok(())
    }

    async fn patch_status<K: Resource>(
        &self,
        resource: &mut K,
        precondition: Precondition,
    ) -> StoreResult<()> {
        let object = DynamicObject::from_resource(&*resource)?;
        let stored = self.patch_object_status(object, precondition).await?;
        *resource = stored.into_resource()?;
        Ok(())
    }

    async fn delete<K: Resource>(&self, key: &NamespacedName) -> StoreResult<()> {
        self.delete_object(K::KIND, key).await
    }

    async fn delete_if_exists<K: Resource>(&self, key: &NamespacedName) -> StoreResult<bool> {
        match self.delete_object(K::KIND, key).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
