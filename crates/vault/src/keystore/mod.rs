//! Device-local persistence for the serialized device key.
//!
//! A [`KeyStore`] is a small asynchronous key-value store scoped to one device.
//! In practice it holds a single entry, [`DEVICE_KEY_ENTRY`], whose value is the
//! base64-encoded raw key bytes.
//!
//! # Invariants
//!
//! - A missing entry is a normal state (first run) and yields `Ok(None)`.
//! - [`KeyStore::put_if_absent`] is atomic: of several racing writers exactly
//!   one observes `true`, and the stored value is that writer's.
//! - Entry names are restricted to `[A-Za-z0-9._-]` so they map safely onto
//!   file names.

pub mod file;
pub mod memory;

pub use file::FileKeyStore;
pub use memory::MemoryKeyStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Name of the entry holding the serialized device key.
pub const DEVICE_KEY_ENTRY: &str = "device-dek";

/// Errors produced by a [`KeyStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing storage failed (quota, corruption, permissions).
    #[error("key store I/O failure on entry `{name}`: {source}")]
    Io {
        /// Entry being read or written.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The backing storage cannot be used in this environment.
    #[error("key store unavailable: {0}")]
    Unavailable(String),

    /// The entry name contains characters outside `[A-Za-z0-9._-]` or is empty.
    #[error("invalid key store entry name: {0:?}")]
    InvalidName(String),
}

/// Asynchronous, device-local key-value persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Store or overwrite the named entry.
    async fn put(&self, name: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Read the named entry, returning `None` if it has never been written.
    async fn get(&self, name: &str) -> Result<Option<Bytes>, StoreError>;

    /// Create the named entry only if it does not exist yet.
    ///
    /// Returns `true` if this call created the entry and `false` if an entry
    /// was already present, in which case it is left untouched.
    async fn put_if_absent(&self, name: &str, value: &[u8]) -> Result<bool, StoreError>;
}

/// Reject entry names that could not be stored as a plain file name.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_entry_name_is_valid() {
        assert!(validate_name(DEVICE_KEY_ENTRY).is_ok());
    }

    #[test]
    fn rejects_path_like_names() {
        for name in ["", "../dek", "a/b", ".hidden", "a b", "dek\0"] {
            assert!(
                matches!(validate_name(name), Err(StoreError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn accepts_simple_names() {
        for name in ["device-dek", "dek.v2", "user_1"] {
            assert!(validate_name(name).is_ok(), "{name:?} should be accepted");
        }
    }
}
