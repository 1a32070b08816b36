//! Errors surfaced by [`FormFieldBinder::save_fields`](super::FormFieldBinder::save_fields).

use formvault_common::RecordStoreError;
use thiserror::Error;

use crate::crypto::CryptoError;

/// Why a single field could not be saved.
#[derive(Debug, Error)]
pub enum SubmitCause {
    /// Encrypting the value failed.
    #[error("encryption failed: {0}")]
    Encrypt(#[source] CryptoError),

    /// The record store rejected or could not take the write.
    #[error("persisting failed: {0}")]
    Persist(#[source] RecordStoreError),
}

/// A form submit stopped at the first failing field.
///
/// Fields listed in `saved` were persisted before the failure and stay saved;
/// there is no rollback. Callers should offer the user a retry.
#[derive(Debug, Error)]
#[error("failed to save field `{field}`: {cause}")]
pub struct SubmitError {
    /// Field whose encrypt or persist step failed.
    pub field: String,
    /// Fields already persisted earlier in the same submit.
    pub saved: Vec<String>,
    /// Underlying failure.
    #[source]
    pub cause: SubmitCause,
}

impl SubmitError {
    /// Returns `true` if resubmitting may succeed without user changes.
    pub fn is_retryable(&self) -> bool {
        match &self.cause {
            SubmitCause::Persist(e) => e.is_transient(),
            SubmitCause::Encrypt(_) => false,
        }
    }
}
