//! Contract of the remote record store that persists encrypted fields.
//!
//! The store is an external collaborator: it receives field names and opaque
//! ciphertext strings and never sees plaintext. [`InMemoryRecordStore`] is a
//! process-local implementation for tests and offline hosts.

pub mod memory;

pub use memory::InMemoryRecordStore;

use async_trait::async_trait;
use formvault_common::{FieldRecord, RecordId, RecordStoreError};

/// Remote persistence of [`FieldRecord`]s, keyed by field name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the records for `fields`. Names without a record are skipped.
    async fn list(&self, fields: &[String]) -> Result<Vec<FieldRecord>, RecordStoreError>;

    /// Create or replace the record for `field`.
    async fn set(&self, field: &str, value: &str) -> Result<(), RecordStoreError>;

    /// Delete the records with the given ids.
    async fn delete_by_ids(&self, ids: &[RecordId]) -> Result<(), RecordStoreError>;

    /// Delete every record.
    async fn delete_all(&self) -> Result<(), RecordStoreError>;
}
