//! AES-256-GCM sealing of JSON-serializable values.
//!
//! **Nonce rule:** every call to [`encrypt`] draws a fresh 96-bit IV from the
//! OS CSPRNG. An IV must never repeat under the same key; GCM nonce reuse
//! breaks both confidentiality and authentication.

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::error::CryptoError;
use crate::dek::DeviceKey;

/// Byte length of an AES-GCM IV (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the GCM authentication tag appended to the ciphertext.
pub const TAG_LEN: usize = 16;

/// Leading byte of a [`CipherFormat::V1`] payload.
const V1_TAG: u8 = 0x01;

/// Layout used when writing new ciphertext.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherFormat {
    /// `0x01 || iv || ciphertext+tag`.
    #[default]
    V1,
    /// `iv || ciphertext+tag`, no format byte.
    Legacy,
}

/// Seals and opens values with a caller-supplied [`DeviceKey`].
///
/// Holds no key and no mutable state; it is `Copy` and safe to share across
/// concurrent tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct CipherService {
    write_format: CipherFormat,
}

impl CipherService {
    /// Create a service writing the given format.
    pub fn new(write_format: CipherFormat) -> Self {
        Self { write_format }
    }

    /// Format used for new ciphertext.
    pub fn write_format(&self) -> CipherFormat {
        self.write_format
    }

    /// Encrypt `value` under `key`. See [`encrypt_with_format`].
    pub fn encrypt<T: Serialize + ?Sized>(&self, value: &T, key: &DeviceKey) -> Result<String, CryptoError> {
        encrypt_with_format(value, key, self.write_format)
    }

    /// Decrypt `ciphertext` under `key`. See [`decrypt`].
    pub fn decrypt(&self, ciphertext: &str, key: &DeviceKey) -> Result<serde_json::Value, CryptoError> {
        decrypt(ciphertext, key)
    }
}

/// Encrypt `value` under `key` using the default [`CipherFormat::V1`] layout.
///
/// # Errors
///
/// Returns [`CryptoError::Encoding`] if `value` cannot be serialized to JSON
/// and [`CryptoError::EngineFailure`] if the AEAD primitive fails.
pub fn encrypt<T: Serialize + ?Sized>(value: &T, key: &DeviceKey) -> Result<String, CryptoError> {
    encrypt_with_format(value, key, CipherFormat::V1)
}

/// Encrypt `value` under `key`, writing the requested layout.
///
/// The value is serialized to JSON, sealed with a fresh random IV, and the
/// whole payload is base64-encoded (standard alphabet, padded).
pub fn encrypt_with_format<T: Serialize + ?Sized>(
    value: &T,
    key: &DeviceKey,
    format: CipherFormat,
) -> Result<String, CryptoError> {
    let plaintext = serde_json::to_vec(value).map_err(|e| CryptoError::Encoding(e.to_string()))?;
    let cipher = build_cipher(key);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_slice())
        .map_err(|_| CryptoError::EngineFailure)?;

    let mut payload = Vec::with_capacity(1 + NONCE_LEN + sealed.len());
    if format == CipherFormat::V1 {
        payload.push(V1_TAG);
    }
    payload.extend_from_slice(&nonce_bytes);
    payload.extend_from_slice(&sealed);

    Ok(STANDARD.encode(payload))
}

/// Decrypt a ciphertext string produced by [`encrypt`] back into JSON.
///
/// Fails closed: no plaintext is returned unless the tag verifies.
///
/// # Errors
///
/// - [`CryptoError::Malformed`] if the input is not base64 or is too short.
/// - [`CryptoError::AuthenticationFailed`] on tag mismatch (tampering, wrong key).
/// - [`CryptoError::Encoding`] if the opened bytes are not UTF-8 JSON.
pub fn decrypt(ciphertext: &str, key: &DeviceKey) -> Result<serde_json::Value, CryptoError> {
    decrypt_as(ciphertext, key)
}

/// Like [`decrypt`], but parses the plaintext into `T`.
pub fn decrypt_as<T: DeserializeOwned>(ciphertext: &str, key: &DeviceKey) -> Result<T, CryptoError> {
    let raw = STANDARD
        .decode(ciphertext.trim())
        .map_err(|_| CryptoError::Malformed("ciphertext is not valid base64".into()))?;
    if raw.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Malformed(format!(
            "ciphertext too short: {} bytes",
            raw.len()
        )));
    }

    let plaintext = open_any(&build_cipher(key), &raw)?;
    let text = std::str::from_utf8(&plaintext)
        .map_err(|_| CryptoError::Encoding("plaintext is not valid UTF-8".into()))?;
    serde_json::from_str(text).map_err(|e| CryptoError::Encoding(e.to_string()))
}

/// Try the tagged layout first when the payload looks tagged, then the legacy one.
fn open_any(cipher: &Aes256Gcm, raw: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if raw[0] == V1_TAG && raw.len() >= 1 + NONCE_LEN + TAG_LEN {
        if let Ok(plaintext) = open(cipher, &raw[1..]) {
            return Ok(plaintext);
        }
    }
    open(cipher, raw)
}

fn open(cipher: &Aes256Gcm, body: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let (nonce, sealed) = body.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| CryptoError::AuthenticationFailed)
}

fn build_cipher(key: &DeviceKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}
