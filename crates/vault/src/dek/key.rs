//! [`DeviceKey`]: the in-memory handle for the device encryption key.

use std::sync::Arc;

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::crypto::CryptoError;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// When this type is dropped, the memory is overwritten with zeroes to
/// minimise the window during which plaintext key material lives in RAM.
struct KeyBytes(Box<[u8; KEY_LEN]>);

impl KeyBytes {
    fn wipe(&mut self) {
        self.0[..].zeroize();
    }
}

impl Drop for KeyBytes {
    fn drop(&mut self) {
        self.wipe();
    }
}

/// Handle to the device's AES-256-GCM key.
///
/// Immutable once created. Clones share the same buffer, so handing the key to
/// many concurrent encrypt/decrypt tasks needs no synchronisation.
#[derive(Clone)]
pub struct DeviceKey(Arc<KeyBytes>);

impl DeviceKey {
    /// Generate a fresh random key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut buf = Box::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut buf[..]);
        Self(Arc::new(KeyBytes(buf)))
    }

    /// Wrap raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Malformed`] unless `bytes` is exactly [`KEY_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::Malformed(format!(
                "device key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(Arc::new(KeyBytes(buf))))
    }

    /// Parse the serialized form written by [`DeviceKey::to_base64`].
    pub fn from_base64(encoded: &[u8]) -> Result<Self, CryptoError> {
        let mut raw = STANDARD
            .decode(encoded)
            .map_err(|_| CryptoError::Malformed("stored device key is not valid base64".into()))?;
        let key = Self::from_bytes(&raw);
        raw.zeroize();
        key
    }

    /// Serialized form: standard base64 of the raw key bytes.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0 .0[..])
    }

    /// Raw key bytes, for the cipher layer only.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0 .0
    }
}

impl PartialEq for DeviceKey {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes()[..].ct_eq(&other.as_bytes()[..]).into()
    }
}

impl Eq for DeviceKey {}

impl std::fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("DeviceKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_differ() {
        assert_ne!(DeviceKey::generate(), DeviceKey::generate());
    }

    #[test]
    fn base64_round_trip() {
        let key = DeviceKey::generate();
        let encoded = key.to_base64();
        assert_eq!(encoded.len(), 44);
        let decoded = DeviceKey::from_base64(encoded.as_bytes()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(DeviceKey::from_bytes(&[0u8; 16]), Err(CryptoError::Malformed(_))));
        let short = STANDARD.encode([0u8; 31]);
        assert!(matches!(DeviceKey::from_base64(short.as_bytes()), Err(CryptoError::Malformed(_))));
    }

    #[test]
    fn rejects_non_base64() {
        assert!(matches!(DeviceKey::from_base64(b"%%%"), Err(CryptoError::Malformed(_))));
    }

    #[test]
    fn clones_share_material() {
        let key = DeviceKey::from_bytes(&[0x42u8; KEY_LEN]).unwrap();
        let clone = key.clone();
        assert_eq!(clone.as_bytes(), &[0x42u8; KEY_LEN]);
        assert_eq!(clone, key);
    }

    #[test]
    fn keys_differing_in_one_byte_are_unequal() {
        let mut bytes = [0x42u8; KEY_LEN];
        let a = DeviceKey::from_bytes(&bytes).unwrap();
        bytes[KEY_LEN - 1] ^= 0x01;
        let b = DeviceKey::from_bytes(&bytes).unwrap();
        assert_ne!(a, b);
        bytes[KEY_LEN - 1] ^= 0x01;
        assert_eq!(a, DeviceKey::from_bytes(&bytes).unwrap());
    }

    #[test]
    fn key_bytes_wiped() {
        let mut bytes = KeyBytes(Box::new([0xA5u8; KEY_LEN]));
        bytes.wipe();
        assert_eq!(*bytes.0, [0u8; KEY_LEN]);
    }

    #[test]
    fn device_key_redacted_in_debug() {
        let key = DeviceKey::from_bytes(&[0xFFu8; KEY_LEN]).unwrap();
        let printed = format!("{key:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("255"));
    }
}
