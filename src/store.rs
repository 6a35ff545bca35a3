//! The collection store contract shared by every backend.

use crate::error::Result;
use crate::records::Entity;
use crate::subscriptions::Subscription;
use crate::types::Scope;
use std::cmp::Ordering;
use std::sync::Arc;

/// Receives every snapshot of a subscribed scope.
pub type SnapshotCallback<T> = Arc<dyn Fn(Result<Vec<T>>) + Send + Sync>;

/// CRUD plus live snapshots for one record kind.
///
/// Every implementation upholds the same rules:
/// - `fetch_all` and every snapshot are ordered by [`sort_snapshot`].
/// - `create` is an upsert keyed by id; `updated_at` is normalized to
///   `created_at`.
/// - `update` fails with `NotFound` for an unknown id, keeps the stored
///   `created_at` and lets the authoritative side assign `updated_at`.
/// - `delete` of an absent id succeeds.
/// - `subscribe` delivers the current snapshot once immediately, then one
///   snapshot per change to the scope, in commit order, to every listener.
pub trait CollectionStore<T: Entity>: Send + Sync {
    /// All records in `scope`, newest display date first.
    fn fetch_all(&self, scope: &Scope) -> Result<Vec<T>>;

    /// A single record, or `None` if it does not exist.
    fn fetch_by_id(&self, scope: &Scope, id: &str) -> Result<Option<T>>;

    /// Insert or replace by id.
    fn create(&self, record: T) -> Result<()>;

    /// Replace an existing record.
    fn update(&self, record: T) -> Result<()>;

    /// Remove a record if present.
    fn delete(&self, scope: &Scope, id: &str) -> Result<()>;

    /// Watch `scope`. See the trait docs for delivery guarantees.
    fn subscribe(&self, scope: &Scope, callback: SnapshotCallback<T>) -> Subscription;

    /// [`CollectionStore::subscribe`] with a plain closure.
    fn on_snapshot<F>(&self, scope: &Scope, f: F) -> Subscription
    where
        F: Fn(Result<Vec<T>>) + Send + Sync + 'static,
        Self: Sized,
    {
        self.subscribe(scope, Arc::new(f))
    }
}

/// Order records by display date, newest first. Undated records go last,
/// and keep their relative input order.
pub fn sort_snapshot<T: Entity>(records: &mut [T]) {
    records.sort_by(|a, b| compare_display_dates(a, b));
}

fn compare_display_dates<T: Entity>(a: &T, b: &T) -> Ordering {
    match (a.display_date(), b.display_date()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
