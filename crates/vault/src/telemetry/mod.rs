//! Structured logging setup for hosts embedding the vault.
//!
//! # Telemetry invariants
//!
//! - **No plaintext, ciphertext, or key material** may appear in any span
//!   attribute or log field. Only field names, counts and error kinds are
//!   logged.
//! - `RUST_LOG` overrides the configured level.

pub mod init;

pub use init::{init_from_config, init_tracing};
