//! Helpers shared by the integration tests.

#![allow(dead_code)]

use flock_store::{
    BreedingEvent, CollectionStore, Entity, InMemoryStore, ManualClock, MatingType, MemoryBackend,
    RemoteStore, Result, Scope, StoreError, Subscription, Timestamp,
};
use parking_lot::Mutex;
use std::sync::Arc;

pub const DAY: i64 = 86_400_000_000;
pub const NOW: Timestamp = Timestamp(1_760_000_000_000_000);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn scope() -> Scope {
    Scope::new("u1", "f1", "g1")
}

pub fn other_scope() -> Scope {
    Scope::new("u1", "f1", "g2")
}

/// A natural-service event joined `days_ago` days before `NOW`.
pub fn joined(id: &str, scope: Scope, days_ago: i64) -> BreedingEvent {
    let mut event = BreedingEvent::new(id, scope, NOW);
    event.mating_type = MatingType::NaturalService;
    event.date_of_joining = Some(Timestamp(NOW.0 - days_ago * DAY));
    event
}

/// Both store flavours over a shared manual clock.
pub struct Fixture<T: Entity> {
    pub clock: Arc<ManualClock>,
    pub backend: Arc<MemoryBackend>,
    pub memory: InMemoryStore<T>,
    pub remote: RemoteStore<T, MemoryBackend>,
}

impl<T: Entity> Fixture<T> {
    pub fn new() -> Self {
        init_tracing();
        let clock = Arc::new(ManualClock::new(NOW));
        let backend = Arc::new(MemoryBackend::with_clock(clock.clone()));
        Self {
            memory: InMemoryStore::with_clock(clock.clone()),
            remote: RemoteStore::new(Arc::clone(&backend)),
            clock,
            backend,
        }
    }

    /// Both stores, for running the same scenario against each.
    pub fn stores(&self) -> Vec<(&'static str, &dyn CollectionStore<T>)> {
        let memory: &dyn CollectionStore<T> = &self.memory;
        let remote: &dyn CollectionStore<T> = &self.remote;
        vec![("memory", memory), ("remote", remote)]
    }
}

/// Everything a subscription delivered, in order.
pub struct Recorder<T> {
    pub seen: Arc<Mutex<Vec<Result<Vec<T>>>>>,
    pub subscription: Subscription,
}

impl<T: Entity> Recorder<T> {
    pub fn attach(store: &dyn CollectionStore<T>, scope: &Scope) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = store.subscribe(
            scope,
            Arc::new(move |snapshot: Result<Vec<T>>| sink.lock().push(snapshot)),
        );
        Self { seen, subscription }
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    /// Ids of every successful delivery.
    pub fn ids(&self) -> Vec<Vec<String>> {
        self.seen
            .lock()
            .iter()
            .map(|snapshot| match snapshot {
                Ok(records) => records.iter().map(|r| r.id().to_string()).collect(),
                Err(e) => vec![format!("error: {e}")],
            })
            .collect()
    }

    pub fn last(&self) -> Option<Result<Vec<T>>> {
        self.seen.lock().last().cloned()
    }

    pub fn errors(&self) -> Vec<StoreError> {
        self.seen
            .lock()
            .iter()
            .filter_map(|snapshot| snapshot.as_ref().err().cloned())
            .collect()
    }
}
