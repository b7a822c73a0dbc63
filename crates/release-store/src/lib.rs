//! Release-Store: resource store abstraction for the release controller
//!
//! This crate provides the persistence boundary the reconciliation core talks
//! to. The controller never owns durable storage; it reads and writes
//! namespaced resource objects through the `ResourceStore` trait.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: Object identity, optimistic concurrency, and finalizer-aware deletion.
//!
//! ## Key Components
//!
//! - `ResourceStore`: Object-safe async store (get/list/create/patch/delete)
//! - `TypedStore`: Typed convenience layer over any `ResourceStore`
//! - `MemoryResourceStore`: In-memory backend with fault injection

mod error;
pub mod fakes;
mod meta;
mod resource;
mod selector;
pub mod storage_traits;

pub use error::StoreError;
pub use meta::{InvalidNamespacedName, NamespacedName, ObjectMeta, OwnerReference, SEPARATOR};
pub use resource::{DynamicObject, Resource};
pub use selector::ListParams;
pub use storage_traits::{
    Precondition, ResourceStore, StoreResult, TypedStore, WatchEvent, WatchEventType,
};
