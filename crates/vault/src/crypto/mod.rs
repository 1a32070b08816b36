//! AES-256-GCM encryption and decryption of JSON form values.
//!
//! This module is free of storage and network dependencies. It turns a
//! serializable value plus a [`DeviceKey`](crate::dek::DeviceKey) into a single
//! self-contained ciphertext string and back.
//!
//! # Ciphertext format
//!
//! ```text
//! v1:     base64( 0x01 || iv[12] || ciphertext || tag[16] )
//! legacy: base64(         iv[12] || ciphertext || tag[16] )
//! ```
//!
//! New ciphertext is written as `v1`. The untagged legacy layout is still
//! accepted on decrypt so records written before the format byte existed keep
//! loading.

pub mod cipher;
pub mod error;

pub use cipher::{
    decrypt, decrypt_as, encrypt, encrypt_with_format, CipherFormat, CipherService, NONCE_LEN,
    TAG_LEN,
};
pub use error::CryptoError;
