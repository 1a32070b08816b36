//! Common record types and errors shared across `formvault` crates.
//!
//! Nothing in this crate touches key material or plaintext; it only describes
//! the opaque records exchanged with the remote record store.

pub mod error;
pub mod protocol;

pub use error::RecordStoreError;
pub use protocol::{FieldRecord, RecordId};
