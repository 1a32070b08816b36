//! [`Vault`]: the key store, key manager, cipher and binder wired together.

use std::sync::Arc;

use formvault_common::RecordStoreError;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::binder::{
    ErrorReporter, FormFieldBinder, LoadOutcome, SaveReport, SubmitError, TracingReporter,
};
use crate::config::VaultConfig;
use crate::crypto::{CipherFormat, CipherService, CryptoError};
use crate::dek::{DeviceKey, KeyManager};
use crate::keystore::{FileKeyStore, KeyStore, StoreError};
use crate::records::RecordStore;

/// Errors surfaced by [`Vault`] operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The device key could not be obtained, or a value could not be sealed/opened.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The record store failed while listing fields.
    #[error(transparent)]
    Records(#[from] RecordStoreError),

    /// A form submit failed part-way.
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Entry point for hosts: one device key, one record store.
#[derive(Debug)]
pub struct Vault {
    keys: KeyManager,
    cipher: CipherService,
    binder: FormFieldBinder,
}

impl Vault {
    /// Build a vault with a [`FileKeyStore`] rooted at `cfg.key_store_dir` and
    /// a [`TracingReporter`] for dropped fields.
    ///
    /// Nothing touches disk until the first operation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidName`] if the configured entry name is invalid.
    pub fn open(cfg: &VaultConfig, records: Arc<dyn RecordStore>) -> Result<Self, StoreError> {
        let key_store = Arc::new(FileKeyStore::new(&cfg.key_store_dir));
        let vault = Self::from_parts(key_store, records, Arc::new(TracingReporter), cfg.cipher_format)
            .with_entry_name(&cfg.key_entry_name)?;
        info!(
            key_store_dir = %cfg.key_store_dir.display(),
            cipher_format = ?cfg.cipher_format,
            "vault opened"
        );
        Ok(vault)
    }

    /// Build a vault from explicit collaborators.
    pub fn from_parts(
        key_store: Arc<dyn KeyStore>,
        records: Arc<dyn RecordStore>,
        reporter: Arc<dyn ErrorReporter>,
        format: CipherFormat,
    ) -> Self {
        let cipher = CipherService::new(format);
        Self {
            keys: KeyManager::new(key_store),
            cipher,
            binder: FormFieldBinder::new(records, reporter).with_cipher(cipher),
        }
    }

    fn with_entry_name(mut self, entry: &str) -> Result<Self, StoreError> {
        self.keys = self.keys.with_entry_name(entry)?;
        Ok(self)
    }

    /// Ensure the device key exists. Safe to call on every start.
    pub async fn initialize(&self) -> Result<(), VaultError> {
        Ok(self.keys.initialize().await?)
    }

    /// The device key, generating it on first use.
    pub async fn key(&self) -> Result<DeviceKey, VaultError> {
        Ok(self.keys.get_or_init_key().await?)
    }

    /// The key manager, for callers that need `get_key` without creating a key.
    pub fn key_manager(&self) -> &KeyManager {
        &self.keys
    }

    /// Encrypt a single value under the device key.
    pub async fn encrypt(&self, value: &Value) -> Result<String, VaultError> {
        let key = self.key().await?;
        Ok(self.cipher.encrypt(value, &key)?)
    }

    /// Decrypt a single value under the device key.
    pub async fn decrypt(&self, ciphertext: &str) -> Result<Value, VaultError> {
        let key = self.key().await?;
        Ok(self.cipher.decrypt(ciphertext, &key)?)
    }

    /// Load and decrypt the named fields from the record store.
    pub async fn load(&self, fields: &[String]) -> Result<LoadOutcome, VaultError> {
        let key = self.key().await?;
        Ok(self.binder.load_from_store(fields, &key).await?)
    }

    /// Encrypt and persist a submitted form.
    pub async fn save(&self, values: &Map<String, Value>) -> Result<SaveReport, VaultError> {
        let key = self.key().await?;
        Ok(self.binder.save_fields(values, &key).await?)
    }

    /// The binder, for callers holding records fetched elsewhere.
    pub fn binder(&self) -> &FormFieldBinder {
        &self.binder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::keystore::MemoryKeyStore;
    use crate::records::InMemoryRecordStore;

    fn memory_vault(records: Arc<InMemoryRecordStore>) -> Vault {
        Vault::from_parts(
            Arc::new(MemoryKeyStore::new()),
            records,
            Arc::new(TracingReporter),
            CipherFormat::V1,
        )
    }

    #[tokio::test]
    async fn key_is_not_created_until_needed() {
        let vault = memory_vault(Arc::new(InMemoryRecordStore::new()));
        assert!(vault.key_manager().get_key().await.unwrap().is_none());
        vault.initialize().await.unwrap();
        assert!(vault.key_manager().get_key().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn encrypt_decrypt_through_vault() {
        let vault = memory_vault(Arc::new(InMemoryRecordStore::new()));
        let ciphertext = vault.encrypt(&json!({"first": "Ada"})).await.unwrap();
        assert_eq!(vault.decrypt(&ciphertext).await.unwrap(), json!({"first": "Ada"}));
    }

    #[tokio::test]
    async fn bad_ciphertext_is_crypto_error() {
        let vault = memory_vault(Arc::new(InMemoryRecordStore::new()));
        let err = vault.decrypt("bm9wZQ==").await.unwrap_err();
        assert!(matches!(err, VaultError::Crypto(CryptoError::Malformed(_))));
    }

    #[test]
    fn open_rejects_bad_entry_name() {
        let cfg = VaultConfig {
            key_entry_name: "a/b".into(),
            ..VaultConfig::new("/tmp/formvault-unused")
        };
        assert!(Vault::open(&cfg, Arc::new(InMemoryRecordStore::new())).is_err());
    }
}
