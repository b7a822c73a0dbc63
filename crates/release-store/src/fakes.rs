//! In-memory fake for the resource store (testing and local runs)
//!
//! Provides `MemoryResourceStore`, which satisfies the `ResourceStore`
//! contract without any external dependencies, plus one-shot fault injection
//! so callers can exercise transient-failure paths.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::StoreError;
use crate::meta::NamespacedName;
use crate::resource::DynamicObject;
use crate::selector::ListParams;
use crate::storage_traits::*;

const WATCH_CAPACITY: usize = 1024;
const GENERATED_SUFFIX_LEN: usize = 5;

/// Store operation targeted by an injected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Get,
    List,
    Create,
    Patch,
    PatchStatus,
    Delete,
}

#[derive(Debug)]
struct Fault {
    operation: StoreOperation,
    kind: String,
    error: StoreError,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<(String, NamespacedName), DynamicObject>,
    last_version: u64,
    faults: Vec<Fault>,
}

impl State {
    fn next_version(&mut self) -> u64 {
        self.last_version += 1;
        self.last_version
    }

    fn take_fault(&mut self, operation: StoreOperation, kind: &str) -> Option<StoreError> {
        let index = self
            .faults
            .iter()
            .position(|f| f.operation == operation && f.kind == kind)?;
        Some(self.faults.remove(index).error)
    }
}

/// In-memory resource store backed by a `BTreeMap<(kind, key), object>`.
///
/// Listing order is deterministic (kind, namespace, name).
#[derive(Debug)]
pub struct MemoryResourceStore {
    state: Mutex<State>,
    events: broadcast::Sender<WatchEvent>,
}

impl Default for MemoryResourceStore {
    fn default() -> Self {
        let (events, _) = broadcast::channel(WATCH_CAPACITY);
        Self {
            state: Mutex::new(State::default()),
            events,
        }
    }
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event_type: WatchEventType, object: &DynamicObject) {
        // No subscribers is fine.
        let _ = self.events.send(WatchEvent {
            event_type,
            object: object.clone(),
        });
    }

    /// Make the next `operation` on `kind` fail with `error`.
    pub fn fail_next(&self, operation: StoreOperation, kind: &str, error: StoreError) {
        self.state().faults.push(Fault {
            operation,
            kind: kind.to_string(),
            error,
        });
    }

    /// Number of stored objects of `kind`.
    pub fn count(&self, kind: &str) -> usize {
        self.state()
            .objects
            .keys()
            .filter(|(k, _)| k == kind)
            .count()
    }

    /// Snapshot of every stored object of `kind`.
    pub fn objects(&self, kind: &str) -> Vec<DynamicObject> {
        self.state()
            .objects
            .iter()
            .filter(|((k, _), _)| k == kind)
            .map(|(_, obj)| obj.clone())
            .collect()
    }
}

fn generated_name(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &suffix[..GENERATED_SUFFIX_LEN])
}

fn conflict(stored: &DynamicObject, precondition: Precondition) -> StoreError {
    StoreError::Conflict {
        kind: stored.kind.clone(),
        key: stored.key().to_string(),
        expected: precondition.resource_version,
        actual: stored.metadata.resource_version,
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn get_object(&self, kind: &str, key: &NamespacedName) -> StoreResult<DynamicObject> {
        let mut state = self.state();
        if let Some(err) = state.take_fault(StoreOperation::Get, kind) {
            return Err(err);
        }
        state
            .objects
            .get(&(kind.to_string(), key.clone()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(kind, key))
    }

    async fn list_objects(
        &self,
        kind: &str,
        params: &ListParams,
    ) -> StoreResult<Vec<DynamicObject>> {
        let mut state = self.state();
        if let Some(err) = state.take_fault(StoreOperation::List, kind) {
            return Err(err);
        }
        let matching = state
            .objects
            .iter()
            .filter(|((k, _), obj)| k == kind && params.matches(obj))
            .map(|(_, obj)| obj.clone());
        Ok(match params.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn create_object(&self, mut object: DynamicObject) -> StoreResult<DynamicObject> {
        let created = {
            let mut state = self.state();
            if let Some(err) = state.take_fault(StoreOperation::Create, &object.kind) {
                return Err(err);
            }
            if object.metadata.namespace.is_empty() {
                return Err(StoreError::Invalid {
                    kind: object.kind.clone(),
                    reason: "metadata.namespace is required".to_string(),
                });
            }
            if object.metadata.name.is_empty() {
                if object.metadata.generate_name.is_empty() {
                    return Err(StoreError::Invalid {
                        kind: object.kind.clone(),
                        reason: "metadata.name or metadata.generateName is required".to_string(),
                    });
                }
                loop {
                    object.metadata.name = generated_name(&object.metadata.generate_name);
                    let taken = state
                        .objects
                        .contains_key(&(object.kind.clone(), object.key()));
                    if !taken {
                        break;
                    }
                }
            }

            let index = (object.kind.clone(), object.key());
            if state.objects.contains_key(&index) {
                return Err(StoreError::AlreadyExists {
                    kind: object.kind.clone(),
                    key: object.key().to_string(),
                });
            }

            object.metadata.uid = uuid::Uuid::new_v4().to_string();
            object.metadata.resource_version = state.next_version();
            object.metadata.creation_timestamp = Some(Utc::now());
            object.metadata.deletion_timestamp = None;
            state.objects.insert(index, object.clone());
            object
        };

        debug!(kind = %created.kind, key = %created.key(), "object created");
        self.publish(WatchEventType::Added, &created);
        Ok(created)
    }

    async fn patch_object(
        &self,
        object: DynamicObject,
        precondition: Precondition,
    ) -> StoreResult<DynamicObject> {
        let (event, result) = {
            let mut state = self.state();
            if let Some(err) = state.take_fault(StoreOperation::Patch, &object.kind) {
                return Err(err);
            }
            let index = (object.kind.clone(), object.key());
            let stored = state
                .objects
                .get(&index)
                .cloned()
                .ok_or_else(|| StoreError::not_found(&object.kind, object.key()))?;
            if stored.metadata.resource_version != precondition.resource_version {
                return Err(conflict(&stored, precondition));
            }

            let mut updated = object;
            updated.metadata.uid = stored.metadata.uid.clone();
            updated.metadata.creation_timestamp = stored.metadata.creation_timestamp;
            updated.metadata.deletion_timestamp = stored.metadata.deletion_timestamp;
            updated.metadata.resource_version = stored.metadata.resource_version;
            match stored.status() {
                Some(status) => {
                    updated.data.insert("status".to_string(), status.clone());
                }
                None => {
                    updated.data.remove("status");
                }
            }

            if updated == stored {
                return Ok(stored);
            }

            updated.metadata.resource_version = state.next_version();
            if updated.metadata.is_being_deleted() && updated.metadata.finalizers.is_empty() {
                state.objects.remove(&index);
                (WatchEventType::Deleted, updated)
            } else {
                state.objects.insert(index, updated.clone());
                (WatchEventType::Modified, updated)
            }
        };

        self.publish(event, &result);
        Ok(result)
    }

    async fn patch_object_status(
        &self,
        object: DynamicObject,
        precondition: Precondition,
    ) -> StoreResult<DynamicObject> {
        let updated = {
            let mut state = self.state();
            if let Some(err) = state.take_fault(StoreOperation::PatchStatus, &object.kind) {
                return Err(err);
            }
            let index = (object.kind.clone(), object.key());
            let stored = state
                .objects
                .get(&index)
                .cloned()
                .ok_or_else(|| StoreError::not_found(&object.kind, object.key()))?;
            if stored.metadata.resource_version != precondition.resource_version {
                return Err(conflict(&stored, precondition));
            }

            let mut updated = stored.clone();
            match object.data.get("status") {
                Some(Value::Null) | None => {
                    updated.data.remove("status");
                }
                Some(status) => {
                    updated.data.insert("status".to_string(), status.clone());
                }
            }

            if updated == stored {
                return Ok(stored);
            }

            updated.metadata.resource_version = state.next_version();
            state.objects.insert(index, updated.clone());
            updated
        };

        self.publish(WatchEventType::Modified, &updated);
        Ok(updated)
    }

    async fn delete_object(&self, kind: &str, key: &NamespacedName) -> StoreResult<()> {
        let (event, object) = {
            let mut state = self.state();
            if let Some(err) = state.take_fault(StoreOperation::Delete, kind) {
                return Err(err);
            }
            let index = (kind.to_string(), key.clone());
            let stored = state
                .objects
                .get(&index)
                .cloned()
                .ok_or_else(|| StoreError::not_found(kind, key))?;

            if stored.metadata.finalizers.is_empty() {
                state.objects.remove(&index);
                (WatchEventType::Deleted, stored)
            } else if stored.metadata.is_being_deleted() {
                return Ok(());
            } else {
                let mut marked = stored;
                marked.metadata.deletion_timestamp = Some(Utc::now());
                marked.metadata.resource_version = state.next_version();
                state.objects.insert(index, marked.clone());
                (WatchEventType::Modified, marked)
            }
        };

        debug!(kind = %kind, key = %key, event = ?event, "object delete requested");
        self.publish(event, &object);
        Ok(())
    }

    fn watch(&self) -> Option<broadcast::Receiver<WatchEvent>> {
        Some(self.events.subscribe())
    }
}
