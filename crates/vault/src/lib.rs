//! `formvault`: client-side encryption of user-supplied form fields.
//!
//! Layering, leaf first:
//! 1. [`keystore`] persists the serialized device key on the local device.
//! 2. [`dek`] generates the device key once and hands out [`DeviceKey`] handles.
//! 3. [`crypto`] seals and opens JSON values with AES-256-GCM.
//! 4. [`binder`] loads and saves whole forms against a remote [`RecordStore`],
//!    which only ever sees ciphertext.
//!
//! [`Vault`] wires the layers together from a [`VaultConfig`].

pub mod binder;
pub mod config;
pub mod crypto;
pub mod dek;
pub mod keystore;
pub mod records;
pub mod telemetry;
pub mod vault;

pub use binder::{FormFieldBinder, LoadOutcome, SaveReport, SubmitError};
pub use config::VaultConfig;
pub use crypto::{CipherFormat, CipherService, CryptoError};
pub use dek::{DeviceKey, KeyManager};
pub use keystore::{FileKeyStore, KeyStore, MemoryKeyStore, StoreError};
pub use records::{InMemoryRecordStore, RecordStore};
pub use vault::{Vault, VaultError};

pub use formvault_common::{FieldRecord, RecordId, RecordStoreError};
