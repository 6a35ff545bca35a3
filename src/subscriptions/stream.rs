//! Channel-backed snapshot streams.

use crate::error::Result;
use crate::records::Entity;
use crate::store::CollectionStore;
use crate::types::Scope;
use crossbeam_channel::{bounded, Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::warn;

use super::Subscription;

/// Configuration for a snapshot stream.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Max buffered snapshots before the stream is dropped.
    /// Default: 64
    pub buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { buffer_size: 64 }
    }
}

/// Snapshots of one scope, pulled from a channel.
///
/// A consumer that lets `buffer_size` snapshots pile up is dropped: its
/// subscription is cancelled and the channel disconnects once the buffered
/// snapshots are drained. Dropping the stream cancels its subscription.
pub struct SnapshotStream<T> {
    subscription: Arc<Subscription>,
    receiver: Receiver<Result<Vec<T>>>,
}

impl<T> SnapshotStream<T> {
    /// Receive the next snapshot (blocking).
    pub fn recv(&self) -> std::result::Result<Result<Vec<T>>, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a snapshot (non-blocking).
    pub fn try_recv(&self) -> std::result::Result<Result<Vec<T>>, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<Result<Vec<T>>, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Stop the stream. Snapshots already buffered can still be received.
    pub fn close(&self) {
        self.subscription.cancel();
    }
}

impl<T> Drop for SnapshotStream<T> {
    fn drop(&mut self) {
        self.subscription.cancel();
    }
}

/// Subscribe to `scope` and receive snapshots through a bounded channel.
pub fn subscribe_stream<T, S>(store: &S, scope: &Scope, config: StreamConfig) -> SnapshotStream<T>
where
    T: Entity,
    S: CollectionStore<T> + ?Sized,
{
    let (sender, receiver) = bounded(config.buffer_size);
    let sender: Arc<Mutex<Option<Sender<Result<Vec<T>>>>>> = Arc::new(Mutex::new(Some(sender)));
    // Filled once `subscribe` returns; lets an overflow cancel its own handle.
    let handle: Arc<Mutex<Weak<Subscription>>> = Arc::new(Mutex::new(Weak::new()));
    let collection = T::KIND.as_str();

    let subscription = {
        let sender = Arc::clone(&sender);
        let handle = Arc::clone(&handle);
        store.subscribe(
            scope,
            Arc::new(move |snapshot: Result<Vec<T>>| {
                let overflowed = {
                    let mut slot = sender.lock();
                    let Some(tx) = slot.as_ref() else {
                        return;
                    };
                    match tx.try_send(snapshot) {
                        Ok(()) => false,
                        Err(TrySendError::Full(_)) => {
                            warn!(collection, "snapshot stream overflowed, dropping subscriber");
                            *slot = None;
                            true
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            *slot = None;
                            true
                        }
                    }
                };
                if overflowed {
                    let subscription = handle.lock().upgrade();
                    if let Some(subscription) = subscription {
                        subscription.cancel();
                    }
                }
            }),
        )
    };
    let subscription = Arc::new(subscription);
    *handle.lock() = Arc::downgrade(&subscription);

    // Overflowed during the initial delivery, before the handle existed.
    if sender.lock().is_none() {
        subscription.cancel();
    }

    SnapshotStream {
        subscription,
        receiver,
    }
}
