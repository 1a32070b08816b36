//! [`InMemoryRecordStore`]: a [`RecordStore`] held in process memory.

use std::collections::HashMap;

use async_trait::async_trait;
use formvault_common::{FieldRecord, RecordId, RecordStoreError};
use tokio::sync::RwLock;

use super::RecordStore;

/// Record store keeping one [`FieldRecord`] per field name in memory.
///
/// `set` on an existing field replaces its value but keeps its id.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, FieldRecord>>,
}

impl InMemoryRecordStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records, e.g. ones fetched elsewhere.
    pub fn with_records(records: impl IntoIterator<Item = FieldRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.field.clone(), r))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// The record currently stored for `field`.
    pub async fn get(&self, field: &str) -> Option<FieldRecord> {
        self.records.read().await.get(field).cloned()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns `true` if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list(&self, fields: &[String]) -> Result<Vec<FieldRecord>, RecordStoreError> {
        let records = self.records.read().await;
        Ok(fields
            .iter()
            .filter_map(|f| records.get(f).cloned())
            .collect())
    }

    async fn set(&self, field: &str, value: &str) -> Result<(), RecordStoreError> {
        let mut records = self.records.write().await;
        records
            .entry(field.to_owned())
            .and_modify(|r| r.value = value.to_owned())
            .or_insert_with(|| FieldRecord::new(field, value));
        Ok(())
    }

    async fn delete_by_ids(&self, ids: &[RecordId]) -> Result<(), RecordStoreError> {
        self.records.write().await.retain(|_, r| !ids.contains(&r.id));
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), RecordStoreError> {
        self.records.write().await.clear();
        Ok(())
    }
}
