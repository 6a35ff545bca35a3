//! Cancellation handles returned by `subscribe`.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Unique identifier for a subscription within one store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Teardown = Box<dyn FnOnce() + Send>;

/// Handle to an active subscription.
///
/// `Active -> Cancelled` is the only transition. The teardown supplied by the
/// store runs exactly once, on the first call to [`Subscription::cancel`];
/// later calls are no-ops. Dropping the handle does not cancel.
pub struct Subscription {
    id: SubscriptionId,
    closed: Arc<AtomicBool>,
    teardown: Mutex<Option<Teardown>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, teardown: impl FnOnce() + Send + 'static) -> Self {
        Self::linked(id, Arc::new(AtomicBool::new(false)), teardown)
    }

    /// A handle whose closed flag is shared with the store, which may close
    /// it on its own (after a terminal error).
    pub(crate) fn linked(
        id: SubscriptionId,
        closed: Arc<AtomicBool>,
        teardown: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            id,
            closed,
            teardown: Mutex::new(Some(Box::new(teardown))),
        }
    }

    /// A handle that starts out cancelled.
    pub(crate) fn cancelled(id: SubscriptionId) -> Self {
        Self {
            id,
            closed: Arc::new(AtomicBool::new(true)),
            teardown: Mutex::new(None),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stop deliveries. When this returns, the callback will not be invoked
    /// again.
    pub fn cancel(&self) {
        // Release the handle lock before running the teardown, which may
        // block on the store.
        let teardown = self.teardown.lock().take();
        self.closed.store(true, Ordering::SeqCst);
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
