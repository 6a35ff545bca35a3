//! # Flock Store
//!
//! Scoped, observable collection stores for the records a flock keeps per
//! lambing season group: breeding events, scanning events and lambing
//! records.
//!
//! ## Core Concepts
//!
//! - **Scope**: `(userId, farmId, lambingSeasonGroupId)`, the boundary every
//!   collection lives in
//! - **Records**: timestamped value records implementing [`Entity`]
//! - **Stores**: [`CollectionStore`] gives CRUD plus live snapshots, with an
//!   in-memory implementation and one over a document backend
//! - **Subscriptions**: every listener sees the current snapshot first, then
//!   one snapshot per change, in commit order
//!
//! ## Example
//!
//! ```ignore
//! use flock_store::{CollectionStore, InMemoryStore, LambingRecord, Scope, Timestamp};
//!
//! let store = InMemoryStore::<LambingRecord>::new();
//! let scope = Scope::new("u1", "farm-1", "spring-2026");
//!
//! let sub = store.on_snapshot(&scope, |snapshot| {
//!     println!("{} records", snapshot.map(|r| r.len()).unwrap_or(0));
//! });
//!
//! store.create(LambingRecord::new("l1", scope.clone(), Timestamp::now(), "UK0123"))?;
//! sub.cancel();
//! ```

pub mod document;
pub mod error;
pub mod memory;
pub mod paths;
pub mod records;
pub mod remote;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use document::{Document, FieldValue};
pub use error::{BackendError, DecodeError, Result, StoreError};
pub use memory::InMemoryStore;
pub use paths::{CollectionKind, CollectionPath, DocumentPath};
pub use records::{
    Assistance, BreedingEvent, Entity, LambingRecord, MatingType, ScanResults, ScanningEvent,
};
pub use remote::{
    CollectionListener, DocumentBackend, DocumentSnapshot, ListenerRegistration, MemoryBackend,
    RemoteStore, SetMode,
};
pub use store::{sort_snapshot, CollectionStore, SnapshotCallback};
pub use subscriptions::{
    subscribe_stream, ListenerRegistry, SnapshotStream, StreamConfig, Subscription,
    SubscriptionId,
};
pub use types::*;
