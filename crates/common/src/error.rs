//! Errors raised by remote record-store implementations.

use thiserror::Error;

/// Failure reported by a record store.
///
/// Variants map to the way a caller should react:
/// - [`RecordStoreError::Unavailable`] → transient, offer a retry
/// - [`RecordStoreError::Rejected`] → the store refused the write
/// - [`RecordStoreError::NotFound`] → a referenced record does not exist
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordStoreError {
    /// The store could not be reached or timed out.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the request (quota, validation, permissions).
    #[error("record store rejected request: {0}")]
    Rejected(String),

    /// A referenced record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
}

impl RecordStoreError {
    /// Returns `true` if retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RecordStoreError::Unavailable(_))
    }
}
