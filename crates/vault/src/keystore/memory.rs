//! [`MemoryKeyStore`]: process-local store for tests and ephemeral hosts.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{validate_name, KeyStore, StoreError};

/// [`KeyStore`] held entirely in memory. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryKeyStore {
    /// Create a new, empty [`MemoryKeyStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn put(&self, name: &str, value: &[u8]) -> Result<(), StoreError> {
        validate_name(name)?;
        self.entries
            .write()
            .await
            .insert(name.to_owned(), Bytes::copy_from_slice(value));
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Bytes>, StoreError> {
        validate_name(name)?;
        Ok(self.entries.read().await.get(name).cloned())
    }

    async fn put_if_absent(&self, name: &str, value: &[u8]) -> Result<bool, StoreError> {
        validate_name(name)?;
        let mut entries = self.entries.write().await;
        if entries.contains_key(name) {
            return Ok(false);
        }
        entries.insert(name.to_owned(), Bytes::copy_from_slice(value));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_entry_is_none() {
        let store = MemoryKeyStore::new();
        assert!(store.get("device-dek").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn put_overwrites() {
        let store = MemoryKeyStore::new();
        store.put("device-dek", b"one").await.unwrap();
        store.put("device-dek", b"two").await.unwrap();
        assert_eq!(&store.get("device-dek").await.unwrap().unwrap()[..], b"two");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn put_if_absent_has_single_winner() {
        let store = std::sync::Arc::new(MemoryKeyStore::new());
        let mut handles = Vec::new();
        for i in 0..8u8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put_if_absent("device-dek", &[i]).await.unwrap()
            }));
        }
        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
