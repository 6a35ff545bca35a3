//! Live snapshot subscriptions.
//!
//! Stores hand out a [`Subscription`] per `subscribe` call and keep their
//! listeners in a [`ListenerRegistry`]. [`subscribe_stream`] turns any store
//! subscription into a channel for consumers that prefer to pull.
//!
//! # Example
//!
//! ```ignore
//! let store = InMemoryStore::<LambingRecord>::new();
//! let stream = subscribe_stream(&store, &scope, StreamConfig::default());
//!
//! // Current snapshot arrives first, even when empty
//! let initial = stream.recv()??;
//! assert!(initial.is_empty());
//!
//! store.create(record)?;
//! let next = stream.recv()??;
//! assert_eq!(next.len(), 1);
//! ```

mod handle;
mod registry;
mod stream;

pub use handle::{Subscription, SubscriptionId};
pub use registry::ListenerRegistry;
pub use stream::{subscribe_stream, SnapshotStream, StreamConfig};
