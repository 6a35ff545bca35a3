//! In-memory collection store.
//!
//! The authoritative state and the listener registry sit behind one reentrant
//! gate. A mutation commits, queues the new snapshot for every listener on the
//! scope, and the outermost holder of the gate drains the queue in FIFO order.
//! Callbacks run with the gate held but the state unborrowed, so they may read
//! the store, cancel, subscribe or even mutate; anything they trigger is queued
//! behind the deliveries already pending, which keeps every listener's view of
//! a scope in commit order.

use crate::error::{Result, StoreError};
use crate::records::Entity;
use crate::store::{sort_snapshot, CollectionStore, SnapshotCallback};
use crate::subscriptions::{ListenerRegistry, Subscription, SubscriptionId};
use crate::types::{Clock, Scope, SystemClock};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

struct State<T> {
    /// Records per scope, keyed by id.
    records: HashMap<Scope, BTreeMap<String, T>>,
    listeners: ListenerRegistry<T>,
    /// Snapshots waiting to be delivered, in commit order.
    pending: VecDeque<(SubscriptionId, Arc<Vec<T>>)>,
    dispatching: bool,
}

impl<T: Entity> State<T> {
    fn view(&self, scope: &Scope) -> Vec<T> {
        let mut records: Vec<T> = self
            .records
            .get(scope)
            .map(|by_id| by_id.values().cloned().collect())
            .unwrap_or_default();
        sort_snapshot(&mut records);
        records
    }

    /// Queue the current view of `scope` for every listener on it.
    fn enqueue_scope(&mut self, scope: &Scope) {
        let ids = self.listeners.matching(scope);
        if ids.is_empty() {
            return;
        }
        let snapshot = Arc::new(self.view(scope));
        for id in ids {
            self.pending.push_back((id, Arc::clone(&snapshot)));
        }
    }
}

struct Shared<T> {
    gate: ReentrantMutex<RefCell<State<T>>>,
    clock: Arc<dyn Clock>,
}

impl<T: Entity> Shared<T> {
    /// Deliver queued snapshots. Must be called with the gate held; returns
    /// immediately if an outer frame is already draining.
    fn drain(cell: &RefCell<State<T>>) {
        {
            let mut state = cell.borrow_mut();
            if state.dispatching {
                return;
            }
            state.dispatching = true;
        }
        let _reset = DispatchReset(cell);

        loop {
            let next = {
                let mut state = cell.borrow_mut();
                let Some((id, snapshot)) = state.pending.pop_front() else {
                    break;
                };
                state.listeners.callback(id).map(|cb| (cb, snapshot))
            };
            // Cancelled listeners have no callback; their entries are skipped.
            if let Some((callback, snapshot)) = next {
                callback(Ok((*snapshot).clone()));
            }
        }
    }

    fn remove_listener(&self, id: SubscriptionId) {
        let guard = self.gate.lock();
        let removed = guard.borrow_mut().listeners.remove(id);
        if removed {
            debug!(collection = T::KIND.as_str(), subscription = %id, "listener removed");
        }
    }
}

/// Clears the dispatching flag even if a callback panics.
struct DispatchReset<'a, T>(&'a RefCell<State<T>>);

impl<T> Drop for DispatchReset<'_, T> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.try_borrow_mut() {
            state.dispatching = false;
        }
    }
}

/// Reference implementation of [`CollectionStore`] holding everything in
/// process memory.
///
/// Cloning yields another handle to the same store.
pub struct InMemoryStore<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Entity> InMemoryStore<T> {
    /// Create an empty store using wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store that stamps updates with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                gate: ReentrantMutex::new(RefCell::new(State {
                    records: HashMap::new(),
                    listeners: ListenerRegistry::new(),
                    pending: VecDeque::new(),
                    dispatching: false,
                })),
                clock,
            }),
        }
    }

    /// Number of active listeners across all scopes.
    pub fn listener_count(&self) -> usize {
        self.shared.gate.lock().borrow().listeners.len()
    }

    /// Number of records in `scope`.
    pub fn len(&self, scope: &Scope) -> usize {
        let guard = self.shared.gate.lock();
        let state = guard.borrow();
        state.records.get(scope).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, scope: &Scope) -> bool {
        self.len(scope) == 0
    }

    /// Apply `change` to the records of `scope`, then fan out if it reports a
    /// change. Commit and delivery happen under one hold of the gate.
    fn mutate<F>(&self, scope: &Scope, change: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, T>) -> Result<bool>,
    {
        let guard = self.shared.gate.lock();
        {
            let mut state = guard.borrow_mut();
            let records = state.records.entry(scope.clone()).or_default();
            let outcome = change(records);
            if records.is_empty() {
                state.records.remove(scope);
            }
            if outcome? {
                state.enqueue_scope(scope);
            }
        }
        Shared::drain(&guard);
        Ok(())
    }
}

impl<T: Entity> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for InMemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Entity> CollectionStore<T> for InMemoryStore<T> {
    fn fetch_all(&self, scope: &Scope) -> Result<Vec<T>> {
        let guard = self.shared.gate.lock();
        let state = guard.borrow();
        Ok(state.view(scope))
    }

    fn fetch_by_id(&self, scope: &Scope, id: &str) -> Result<Option<T>> {
        let guard = self.shared.gate.lock();
        let state = guard.borrow();
        Ok(state
            .records
            .get(scope)
            .and_then(|by_id| by_id.get(id))
            .cloned())
    }

    fn create(&self, mut record: T) -> Result<()> {
        record.set_updated_at(record.created_at());
        let scope = record.scope().clone();
        debug!(collection = T::KIND.as_str(), scope = %scope, id = record.id(), "create");
        self.mutate(&scope, |records| {
            records.insert(record.id().to_string(), record);
            Ok(true)
        })
    }

    fn update(&self, mut record: T) -> Result<()> {
        let scope = record.scope().clone();
        let now = self.shared.clock.now();
        debug!(collection = T::KIND.as_str(), scope = %scope, id = record.id(), "update");
        self.mutate(&scope, |records| {
            let existing = records
                .get(record.id())
                .ok_or_else(|| StoreError::not_found(T::KIND.as_str(), record.id()))?;
            record.set_created_at(existing.created_at());
            record.set_updated_at(now.max(existing.updated_at()));
            records.insert(record.id().to_string(), record);
            Ok(true)
        })
    }

    fn delete(&self, scope: &Scope, id: &str) -> Result<()> {
        debug!(collection = T::KIND.as_str(), scope = %scope, id, "delete");
        self.mutate(scope, |records| Ok(records.remove(id).is_some()))
    }

    fn subscribe(&self, scope: &Scope, callback: SnapshotCallback<T>) -> Subscription {
        let guard = self.shared.gate.lock();
        let id = {
            let mut state = guard.borrow_mut();
            let id = state.listeners.register(scope.clone(), callback);
            let snapshot = Arc::new(state.view(scope));
            state.pending.push_back((id, snapshot));
            id
        };
        debug!(collection = T::KIND.as_str(), scope = %scope, subscription = %id, "listener added");
        Shared::drain(&guard);
        drop(guard);

        let shared = Arc::downgrade(&self.shared);
        Subscription::new(id, move || {
            if let Some(shared) = shared.upgrade() {
                shared.remove_listener(id);
            }
        })
    }
}
