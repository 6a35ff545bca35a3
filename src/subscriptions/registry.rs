//! Registry of listeners keyed by subscription id.

use crate::store::SnapshotCallback;
use crate::types::Scope;
use std::collections::BTreeMap;

use super::SubscriptionId;

struct Listener<T> {
    scope: Scope,
    callback: SnapshotCallback<T>,
}

/// Maps subscription ids to scoped callbacks.
///
/// Not synchronized on its own: the owning store keeps it under the same
/// lock as its records. Ids are handed out in increasing order and iteration
/// follows registration order, so fan-out order is stable.
pub struct ListenerRegistry<T> {
    listeners: BTreeMap<SubscriptionId, Listener<T>>,
    next_id: u64,
}

impl<T> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self {
            listeners: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Register a callback for `scope`.
    pub fn register(&mut self, scope: Scope, callback: SnapshotCallback<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id, Listener { scope, callback });
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn is_active(&self, id: SubscriptionId) -> bool {
        self.listeners.contains_key(&id)
    }

    pub fn callback(&self, id: SubscriptionId) -> Option<SnapshotCallback<T>> {
        self.listeners.get(&id).map(|l| l.callback.clone())
    }

    /// Ids of every listener on `scope`, in registration order.
    pub fn matching(&self, scope: &Scope) -> Vec<SubscriptionId> {
        self.listeners
            .iter()
            .filter(|(_, l)| &l.scope == scope)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
