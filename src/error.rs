//! Error types for the collection stores.

use thiserror::Error;

/// Main error type for store operations.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No signed-in user")]
    Unauthenticated,
}

impl StoreError {
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// True for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Failure reported by a document backend.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Backend error: {0}")]
    Internal(String),

    /// A write that requires an existing document found none.
    #[error("Document not found: {0}")]
    NotFound(String),
}

impl From<BackendError> for StoreError {
    fn from(e: BackendError) -> Self {
        StoreError::Transport(e.to_string())
    }
}

/// A document that could not be turned into a record.
///
/// Never surfaced to callers; the remote store logs it and drops the document.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} has wrong type: expected {expected}, found {found}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Field {field} has invalid value: {value}")]
    InvalidValue { field: &'static str, value: String },

    /// The document's own scope fields disagree with the collection it was
    /// read from.
    #[error("Document belongs to scope {0}")]
    ForeignScope(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
