//! The document backend port the remote store is written against.

use crate::document::Document;
use crate::error::BackendError;
use crate::paths::{CollectionPath, DocumentPath};
use std::fmt;
use std::sync::Arc;

/// One document as seen at a point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    pub path: DocumentPath,
    /// `None` if the document does not exist.
    pub data: Option<Document>,
}

impl DocumentSnapshot {
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    pub fn id(&self) -> &str {
        self.path.id()
    }
}

/// How `set_document` treats an existing document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetMode {
    /// Overwrite the whole document.
    Replace,
    /// Overlay the given fields, keeping the others. Creates the document if
    /// missing.
    Merge,
    /// Like `Merge`, but fails with `BackendError::NotFound` if the document
    /// does not exist at commit time.
    MergeExisting,
}

/// Receives the full document set of a collection on every change.
pub type CollectionListener =
    Arc<dyn Fn(Result<Vec<DocumentSnapshot>, BackendError>) + Send + Sync>;

/// Detaches a collection listener.
pub struct ListenerRegistration {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerRegistration {
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Detach the listener. No notifications are delivered after this
    /// returns.
    pub fn remove(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

/// A hierarchical document database.
///
/// Retry and timeout policy belong to the implementation; the store passes
/// failures through as transport errors.
pub trait DocumentBackend: Send + Sync {
    /// Read one document. A missing document is a snapshot with no data.
    fn get_document(&self, path: &DocumentPath) -> Result<DocumentSnapshot, BackendError>;

    /// Read every document in a collection.
    fn get_documents(&self, collection: &CollectionPath)
        -> Result<Vec<DocumentSnapshot>, BackendError>;

    /// Write a document. `FieldValue::ServerTimestamp` fields are replaced
    /// with the backend's commit time; `ServerTimestampAtLeast` fields with
    /// the later of the commit time and their floor.
    fn set_document(&self, path: &DocumentPath, data: Document, mode: SetMode)
        -> Result<(), BackendError>;

    /// Delete a document. Deleting a missing document succeeds.
    fn delete_document(&self, path: &DocumentPath) -> Result<(), BackendError>;

    /// Watch a collection. The current document set is delivered once on
    /// attach, then again after every change. An error delivery is terminal.
    fn listen(
        &self,
        collection: &CollectionPath,
        listener: CollectionListener,
    ) -> Result<ListenerRegistration, BackendError>;
}
