//! In-process document backend for tests and local demos.
//!
//! Behaves like a hosted document database from the store's point of view:
//! server timestamps are resolved with the backend's own clock, listeners get
//! the full collection on attach and after every change, and failures can be
//! injected to exercise transport-error paths. Listener notifications are
//! queued and drained in commit order, like the in-memory store.

use crate::document::Document;
use crate::error::BackendError;
use crate::paths::{CollectionPath, DocumentPath};
use crate::types::{Clock, SystemClock};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Weak};
use tracing::debug;

use super::backend::{
    CollectionListener, DocumentBackend, DocumentSnapshot, ListenerRegistration, SetMode,
};

type Notification = Result<Vec<DocumentSnapshot>, BackendError>;

struct State {
    /// Documents per collection, keyed by document id.
    collections: BTreeMap<CollectionPath, BTreeMap<String, Document>>,
    listeners: BTreeMap<u64, (CollectionPath, CollectionListener)>,
    next_listener: u64,
    pending: VecDeque<(u64, Arc<Notification>)>,
    dispatching: bool,
    /// Returned by every call while set.
    failure: Option<BackendError>,
}

impl State {
    fn check(&self) -> Result<(), BackendError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn snapshot(&self, collection: &CollectionPath) -> Vec<DocumentSnapshot> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| DocumentSnapshot {
                        path: collection.doc(id),
                        data: Some(data.clone()),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn notify(&mut self, collection: &CollectionPath) {
        let ids: Vec<u64> = self
            .listeners
            .iter()
            .filter(|(_, (path, _))| path == collection)
            .map(|(id, _)| *id)
            .collect();
        if ids.is_empty() {
            return;
        }
        let notification = Arc::new(Ok(self.snapshot(collection)));
        for id in ids {
            self.pending.push_back((id, Arc::clone(&notification)));
        }
    }
}

struct Inner {
    gate: ReentrantMutex<RefCell<State>>,
}

impl Inner {
    /// Deliver queued notifications in FIFO order. Listeners run with the gate
    /// released; a nested or concurrent call only enqueues and leaves the
    /// delivery to the thread already draining.
    fn drain(&self) {
        {
            let guard = self.gate.lock();
            let mut state = guard.borrow_mut();
            if state.dispatching {
                return;
            }
            state.dispatching = true;
        }
        let _reset = DispatchReset(self);

        loop {
            let next = {
                let guard = self.gate.lock();
                let mut state = guard.borrow_mut();
                let Some((id, notification)) = state.pending.pop_front() else {
                    state.dispatching = false;
                    break;
                };
                let listener = state.listeners.get(&id).map(|(_, l)| Arc::clone(l));
                // Errors end the listener.
                if notification.is_err() {
                    state.listeners.remove(&id);
                }
                listener.map(|l| (l, notification))
            };
            if let Some((listener, notification)) = next {
                listener((*notification).clone());
            }
        }
    }

    fn detach(&self, id: u64) {
        let guard = self.gate.lock();
        if guard.borrow_mut().listeners.remove(&id).is_some() {
            debug!(listener = id, "collection listener detached");
        }
    }
}

/// Clears the dispatching flag if a listener panics mid-drain.
struct DispatchReset<'a>(&'a Inner);

impl Drop for DispatchReset<'_> {
    fn drop(&mut self) {
        // On a normal exit the drain loop already cleared the flag, and
        // another thread may have set it since.
        if !std::thread::panicking() {
            return;
        }
        let guard = self.0.gate.lock();
        if let Ok(mut state) = guard.try_borrow_mut() {
            state.dispatching = false;
        };
    }
}

/// A [`DocumentBackend`] held entirely in memory.
///
/// Cloning yields another handle to the same database.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
    clock: Arc<dyn Clock>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// A backend that stamps server timestamps with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                gate: ReentrantMutex::new(RefCell::new(State {
                    collections: BTreeMap::new(),
                    listeners: BTreeMap::new(),
                    next_listener: 1,
                    pending: VecDeque::new(),
                    dispatching: false,
                    failure: None,
                })),
            }),
            clock,
        }
    }

    /// Make every subsequent call fail with `failure`, or clear it with `None`.
    pub fn set_failure(&self, failure: Option<BackendError>) {
        let guard = self.inner.gate.lock();
        guard.borrow_mut().failure = failure;
    }

    /// Deliver `error` to every attached listener, ending them.
    pub fn fail_listeners(&self, error: BackendError) {
        let guard = self.inner.gate.lock();
        {
            let mut state = guard.borrow_mut();
            let notification = Arc::new(Err(error));
            let ids: Vec<u64> = state.listeners.keys().copied().collect();
            for id in ids {
                state.pending.push_back((id, Arc::clone(&notification)));
            }
        }
        drop(guard);
        self.inner.drain();
    }

    /// Store `data` verbatim, bypassing any record codec. Used to plant
    /// malformed documents.
    pub fn insert_raw(&self, path: &DocumentPath, data: Document) {
        let guard = self.inner.gate.lock();
        {
            let mut state = guard.borrow_mut();
            let collection = path.parent();
            state
                .collections
                .entry(collection.clone())
                .or_default()
                .insert(path.id().to_string(), data);
            state.notify(&collection);
        }
        drop(guard);
        self.inner.drain();
    }

    /// Raw stored document, if any.
    pub fn document(&self, path: &DocumentPath) -> Option<Document> {
        let guard = self.inner.gate.lock();
        let state = guard.borrow();
        state
            .collections
            .get(&path.parent())
            .and_then(|docs| docs.get(path.id()))
            .cloned()
    }

    /// Number of attached collection listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.gate.lock().borrow().listeners.len()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBackend for MemoryBackend {
    fn get_document(&self, path: &DocumentPath) -> Result<DocumentSnapshot, BackendError> {
        let guard = self.inner.gate.lock();
        let state = guard.borrow();
        state.check()?;
        let data = state
            .collections
            .get(&path.parent())
            .and_then(|docs| docs.get(path.id()))
            .cloned();
        Ok(DocumentSnapshot {
            path: path.clone(),
            data,
        })
    }

    fn get_documents(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<DocumentSnapshot>, BackendError> {
        let guard = self.inner.gate.lock();
        let state = guard.borrow();
        state.check()?;
        Ok(state.snapshot(collection))
    }

    fn set_document(
        &self,
        path: &DocumentPath,
        data: Document,
        mode: SetMode,
    ) -> Result<(), BackendError> {
        let guard = self.inner.gate.lock();
        {
            let mut state = guard.borrow_mut();
            state.check()?;
            let collection = path.parent();
            let docs = state.collections.entry(collection.clone()).or_default();
            let mut stored = match (mode, docs.remove(path.id())) {
                (SetMode::Merge | SetMode::MergeExisting, Some(mut existing)) => {
                    existing.merge(data);
                    existing
                }
                (SetMode::MergeExisting, None) => {
                    return Err(BackendError::NotFound(path.to_string()));
                }
                (SetMode::Merge | SetMode::Replace, _) => data,
            };
            stored.resolve_server_timestamps(self.clock.now());
            docs.insert(path.id().to_string(), stored);
            state.notify(&collection);
        }
        drop(guard);
        self.inner.drain();
        Ok(())
    }

    fn delete_document(&self, path: &DocumentPath) -> Result<(), BackendError> {
        let guard = self.inner.gate.lock();
        {
            let mut state = guard.borrow_mut();
            state.check()?;
            let collection = path.parent();
            let removed = state
                .collections
                .get_mut(&collection)
                .and_then(|docs| docs.remove(path.id()))
                .is_some();
            if removed {
                state.notify(&collection);
            }
        }
        drop(guard);
        self.inner.drain();
        Ok(())
    }

    fn listen(
        &self,
        collection: &CollectionPath,
        listener: CollectionListener,
    ) -> Result<ListenerRegistration, BackendError> {
        let guard = self.inner.gate.lock();
        let id = {
            let mut state = guard.borrow_mut();
            state.check()?;
            let id = state.next_listener;
            state.next_listener += 1;
            state.listeners.insert(id, (collection.clone(), listener));
            let initial = Arc::new(Ok(state.snapshot(collection)));
            state.pending.push_back((id, initial));
            id
        };
        debug!(listener = id, collection = %collection, "collection listener attached");
        drop(guard);
        self.inner.drain();

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Ok(ListenerRegistration::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.detach(id);
            }
        }))
    }
}
