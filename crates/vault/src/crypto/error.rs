//! Errors produced by the key manager and cipher layer.

use thiserror::Error;

use crate::keystore::StoreError;

/// Errors produced while obtaining the device key or sealing/opening a value.
///
/// `AuthenticationFailed` and `Malformed` are expected for stale or tampered
/// records and are recoverable at the call site. No variant ever carries
/// plaintext or key material.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The GCM tag did not verify: tampered ciphertext or the wrong key.
    #[error("ciphertext authentication failed")]
    AuthenticationFailed,

    /// The input is not structurally valid (bad base64, too short, bad key length).
    #[error("malformed input: {0}")]
    Malformed(String),

    /// The opened plaintext is not UTF-8 JSON, or a value could not be serialized.
    #[error("encoding failure: {0}")]
    Encoding(String),

    /// The AEAD primitive itself failed.
    #[error("crypto engine failure")]
    EngineFailure,

    /// The device key could not be read from or written to the key store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The device key is still absent after initialisation.
    #[error("device key unavailable")]
    KeyUnavailable,
}

impl CryptoError {
    /// Returns `true` for failures caused by the ciphertext itself rather than
    /// by the environment.
    pub fn is_bad_ciphertext(&self) -> bool {
        matches!(
            self,
            CryptoError::AuthenticationFailed | CryptoError::Malformed(_) | CryptoError::Encoding(_)
        )
    }
}
