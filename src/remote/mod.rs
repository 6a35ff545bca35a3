//! Collection store backed by a document database.
//!
//! Records live at their canonical address (see [`crate::paths`]). Reads
//! decode each document on its own and skip the ones that fail, so one bad
//! document shrinks a result instead of failing it. Each `subscribe` call
//! attaches one collection listener and re-decodes the full document set on
//! every notification.
//!
//! Full-set resends cost O(collection size) per change, which is fine for the
//! per-group collection sizes this store is meant for.

mod backend;
mod memory_backend;

pub use backend::{
    CollectionListener, DocumentBackend, DocumentSnapshot, ListenerRegistration, SetMode,
};
pub use memory_backend::MemoryBackend;

use crate::document::{Document, FieldValue};
use crate::error::{BackendError, DecodeError, Result, StoreError};
use crate::paths::{CollectionPath, DocumentPath};
use crate::records::{Entity, CREATED_AT, UPDATED_AT};
use crate::store::{sort_snapshot, CollectionStore, SnapshotCallback};
use crate::subscriptions::{Subscription, SubscriptionId};
use crate::types::Scope;
use parking_lot::{Mutex, ReentrantMutex};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// [`CollectionStore`] over a [`DocumentBackend`].
pub struct RemoteStore<T, B: ?Sized> {
    backend: Arc<B>,
    /// Serializes this store's entry points; reentrant so callbacks may call
    /// back in.
    gate: ReentrantMutex<()>,
    next_id: AtomicU64,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Entity, B: DocumentBackend + ?Sized> RemoteStore<T, B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            gate: ReentrantMutex::new(()),
            next_id: AtomicU64::new(1),
            _kind: PhantomData,
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    fn collection(scope: &Scope) -> CollectionPath {
        CollectionPath::new(scope, T::KIND)
    }

    fn document(record: &T) -> DocumentPath {
        Self::collection(record.scope()).doc(record.id())
    }
}

impl<T: Entity, B: DocumentBackend + ?Sized> CollectionStore<T> for RemoteStore<T, B> {
    fn fetch_all(&self, scope: &Scope) -> Result<Vec<T>> {
        let _gate = self.gate.lock();
        let documents = self.backend.get_documents(&Self::collection(scope))?;
        Ok(decode_documents(scope, &documents))
    }

    fn fetch_by_id(&self, scope: &Scope, id: &str) -> Result<Option<T>> {
        let _gate = self.gate.lock();
        let snapshot = self.backend.get_document(&Self::collection(scope).doc(id))?;
        Ok(decode_snapshot(scope, &snapshot))
    }

    fn create(&self, mut record: T) -> Result<()> {
        let _gate = self.gate.lock();
        record.set_updated_at(record.created_at());
        let path = Self::document(&record);
        debug!(path = %path, "create");
        self.backend
            .set_document(&path, record.to_document(), SetMode::Replace)?;
        Ok(())
    }

    fn update(&self, record: T) -> Result<()> {
        let _gate = self.gate.lock();
        let path = Self::document(&record);
        let not_found = || StoreError::not_found(T::KIND.as_str(), record.id());
        let Some(existing) = self.backend.get_document(&path)?.data else {
            return Err(not_found());
        };

        // Everything but createdAt is re-asserted. The commit time comes from
        // the backend but never precedes the stored updatedAt.
        let mut data = record.to_document();
        data.remove(CREATED_AT);
        data.insert(UPDATED_AT, stamp_after(&existing));
        debug!(path = %path, "update");
        match self.backend.set_document(&path, data, SetMode::MergeExisting) {
            Ok(()) => Ok(()),
            // Deleted by another writer since the read above.
            Err(BackendError::NotFound(_)) => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, scope: &Scope, id: &str) -> Result<()> {
        let _gate = self.gate.lock();
        let path = Self::collection(scope).doc(id);
        debug!(path = %path, "delete");
        self.backend.delete_document(&path)?;
        Ok(())
    }

    fn subscribe(&self, scope: &Scope, callback: SnapshotCallback<T>) -> Subscription {
        let _gate = self.gate.lock();
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let collection = Self::collection(scope);
        let link = Arc::new(RemoteLink {
            delivery: ReentrantMutex::new(()),
            closed: Arc::new(AtomicBool::new(false)),
            registration: Mutex::new(None),
        });

        let listener: CollectionListener = {
            let link = Arc::clone(&link);
            let scope = scope.clone();
            let callback = Arc::clone(&callback);
            Arc::new(move |notification| link.deliver(id, &scope, &callback, notification))
        };

        match self.backend.listen(&collection, listener) {
            Ok(registration) => {
                debug!(collection = %collection, subscription = %id, "listener added");
                link.attach(registration);
                let closed = Arc::clone(&link.closed);
                Subscription::linked(id, closed, move || link.cancel())
            }
            Err(e) => {
                warn!(collection = %collection, subscription = %id, error = %e, "listen failed");
                callback(Err(e.into()));
                Subscription::cancelled(id)
            }
        }
    }
}

/// The `updatedAt` sentinel for an update of `existing`.
fn stamp_after(existing: &Document) -> FieldValue {
    let prior = match existing.opt_timestamp(UPDATED_AT) {
        Ok(Some(ts)) => Some(ts),
        _ => existing.opt_timestamp(CREATED_AT).ok().flatten(),
    };
    match prior {
        Some(floor) => FieldValue::ServerTimestampAtLeast(floor),
        None => FieldValue::ServerTimestamp,
    }
}

/// Decode one document read from `scope`'s collection. Missing, malformed and
/// foreign-scope documents read as `None`.
fn decode_snapshot<T: Entity>(scope: &Scope, snapshot: &DocumentSnapshot) -> Option<T> {
    let data = snapshot.data.as_ref()?;
    let decoded = T::from_document(snapshot.id(), data).and_then(|record| {
        if record.scope() == scope {
            Ok(record)
        } else {
            Err(DecodeError::ForeignScope(record.scope().to_string()))
        }
    });
    match decoded {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(path = %snapshot.path, error = %e, "skipping malformed document");
            None
        }
    }
}

/// Decode every existing document, dropping the ones that fail, and order the
/// result like every other snapshot.
fn decode_documents<T: Entity>(scope: &Scope, documents: &[DocumentSnapshot]) -> Vec<T> {
    let mut records: Vec<T> = documents
        .iter()
        .filter_map(|snapshot| decode_snapshot(scope, snapshot))
        .collect();
    sort_snapshot(&mut records);
    records
}

/// Ties one local subscription to its collection listener.
struct RemoteLink {
    /// Held while a notification is delivered.
    delivery: ReentrantMutex<()>,
    /// Shared with the [`Subscription`]; set on cancel or terminal error.
    closed: Arc<AtomicBool>,
    registration: Mutex<Option<ListenerRegistration>>,
}

impl RemoteLink {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn deliver<T: Entity>(
        &self,
        id: SubscriptionId,
        scope: &Scope,
        callback: &SnapshotCallback<T>,
        notification: std::result::Result<Vec<DocumentSnapshot>, BackendError>,
    ) {
        let delivery = self.delivery.lock();
        if self.is_closed() {
            return;
        }
        match notification {
            Ok(documents) => callback(Ok(decode_documents(scope, &documents))),
            Err(e) => {
                warn!(
                    collection = T::KIND.as_str(),
                    scope = %scope,
                    subscription = %id,
                    error = %e,
                    "listener failed"
                );
                self.closed.store(true, Ordering::SeqCst);
                callback(Err(e.into()));
                drop(delivery);
                self.detach();
            }
        }
    }

    fn attach(&self, registration: ListenerRegistration) {
        *self.registration.lock() = Some(registration);
        // A terminal error may already have arrived with the initial delivery.
        if self.is_closed() {
            self.detach();
        }
    }

    fn cancel(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // Waits for an in-flight delivery on another thread.
        drop(self.delivery.lock());
        self.detach();
    }

    /// Remove the collection listener, at most once.
    fn detach(&self) {
        let registration = self.registration.lock().take();
        if let Some(registration) = registration {
            registration.remove();
        }
    }
}
