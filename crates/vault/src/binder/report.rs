//! Reporting of per-field decryption failures to an observability sink.

use tracing::warn;

use crate::crypto::CryptoError;

/// Receives field decryption failures that were recovered locally.
///
/// Implementations must not block; they run on the form-load path.
#[cfg_attr(test, mockall::automock)]
pub trait ErrorReporter: Send + Sync {
    /// Record that `field` could not be decrypted.
    fn report(&self, field: &str, error: &CryptoError);
}

/// [`ErrorReporter`] that emits a `tracing` warning per failed field.
///
/// Only the field name and error kind are logged, never the ciphertext.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, field: &str, error: &CryptoError) {
        warn!(field = %field, error = %error, "dropping field that failed to decrypt");
    }
}
