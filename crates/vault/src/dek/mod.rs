//! Device encryption key (DEK) lifecycle: get-or-create on top of a [`KeyStore`].
//!
//! # Lifecycle
//!
//! 1. [`KeyManager::initialize`] checks the key store for a serialized key and,
//!    if none exists, generates a 256-bit key and persists its base64 form.
//! 2. [`KeyManager::get_key`] reads and deserializes the key on every call;
//!    `None` means "not initialised yet", not an error.
//! 3. The key is never rotated or deleted here. Losing the key store means
//!    losing every value encrypted under it; there is no escrow.
//!
//! # Concurrency
//!
//! `initialize` runs behind an in-process latch and creates the entry with
//! [`KeyStore::put_if_absent`], so racing first runs (even from separate
//! managers sharing one store) converge on a single key.
//!
//! # Security invariants
//!
//! - The plaintext key is **never** logged or included in traces.

pub mod key;

pub use key::{DeviceKey, KEY_LEN};

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::crypto::CryptoError;
use crate::keystore::{validate_name, KeyStore, StoreError, DEVICE_KEY_ENTRY};

/// Get-or-create access to the device key.
pub struct KeyManager {
    store: Arc<dyn KeyStore>,
    entry: String,
    init_latch: Mutex<()>,
}

impl KeyManager {
    /// Create a manager using the default [`DEVICE_KEY_ENTRY`] slot.
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            store,
            entry: DEVICE_KEY_ENTRY.to_owned(),
            init_latch: Mutex::new(()),
        }
    }

    /// Use a different entry name for the serialized key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidName`] if `entry` is not a valid store name.
    pub fn with_entry_name(mut self, entry: impl Into<String>) -> Result<Self, StoreError> {
        let entry = entry.into();
        validate_name(&entry)?;
        self.entry = entry;
        Ok(self)
    }

    /// Name of the key store entry holding the serialized key.
    pub fn entry_name(&self) -> &str {
        &self.entry
    }

    /// Ensure a device key exists, generating and persisting one on first run.
    ///
    /// Idempotent: once a key is stored, further calls cost one store read.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Store`] if the key store cannot be read or written.
    pub async fn initialize(&self) -> Result<(), CryptoError> {
        let _latch = self.init_latch.lock().await;

        if self.store.get(&self.entry).await?.is_some() {
            debug!(entry = %self.entry, "device key already present");
            return Ok(());
        }

        let key = DeviceKey::generate();
        let serialized = key.to_base64();
        if self.store.put_if_absent(&self.entry, serialized.as_bytes()).await? {
            info!(entry = %self.entry, "device key generated");
        } else {
            debug!(entry = %self.entry, "device key created concurrently; keeping stored key");
        }
        Ok(())
    }

    /// Read the device key, or `None` if [`initialize`](Self::initialize) has
    /// not stored one yet.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Store`] on key store failure and
    /// [`CryptoError::Malformed`] if the stored entry is not a valid key.
    pub async fn get_key(&self) -> Result<Option<DeviceKey>, CryptoError> {
        match self.store.get(&self.entry).await? {
            Some(serialized) => DeviceKey::from_base64(&serialized).map(Some),
            None => Ok(None),
        }
    }

    /// [`initialize`](Self::initialize), then [`get_key`](Self::get_key).
    ///
    /// # Errors
    ///
    /// As for the two calls, plus [`CryptoError::KeyUnavailable`] if the key
    /// is still absent afterwards.
    pub async fn get_or_init_key(&self) -> Result<DeviceKey, CryptoError> {
        self.initialize().await?;
        self.get_key().await?.ok_or(CryptoError::KeyUnavailable)
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}
