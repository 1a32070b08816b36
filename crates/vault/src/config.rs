//! Configuration loading and validation for an embedded vault.
//!
//! Values are read from environment variables prefixed with `FORMVAULT_`
//! (e.g. `FORMVAULT_KEY_STORE_DIR`). Hosts that configure the vault in code
//! use [`VaultConfig::new`] instead.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::CipherFormat;
use crate::keystore::{validate_name, DEVICE_KEY_ENTRY};

/// Prefix of every environment variable read by [`VaultConfig::from_env`].
pub const ENV_PREFIX: &str = "FORMVAULT";

/// Validated vault configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    /// Directory holding the device key store. **Required.**
    pub key_store_dir: PathBuf,

    /// Key store entry holding the serialized device key.
    #[serde(default = "default_key_entry_name")]
    pub key_entry_name: String,

    /// Layout used when writing new ciphertext (`"v1"` or `"legacy"`).
    #[serde(default)]
    pub cipher_format: CipherFormat,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,
}

fn default_key_entry_name() -> String {
    DEVICE_KEY_ENTRY.into()
}
fn default_log_level() -> String {
    "info".into()
}

impl VaultConfig {
    /// Configuration with defaults for everything but the key store directory.
    pub fn new(key_store_dir: impl Into<PathBuf>) -> Self {
        Self {
            key_store_dir: key_store_dir.into(),
            key_entry_name: default_key_entry_name(),
            cipher_format: CipherFormat::default(),
            log_level: default_log_level(),
            log_json: false,
        }
    }

    /// Load and validate configuration from `FORMVAULT_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("failed to build configuration from environment")?;

        let c: VaultConfig = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    pub fn validate(&self) -> Result<()> {
        if self.key_store_dir.as_os_str().is_empty() {
            anyhow::bail!("FORMVAULT_KEY_STORE_DIR is required and must not be empty");
        }
        validate_name(&self.key_entry_name).context("FORMVAULT_KEY_ENTRY_NAME is invalid")?;
        if self.log_level.trim().is_empty() {
            anyhow::bail!("FORMVAULT_LOG_LEVEL must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_key_entry_name(), "device-dek");
        assert_eq!(default_log_level(), "info");
        let cfg = VaultConfig::new("/var/lib/app/keys");
        assert_eq!(cfg.cipher_format, CipherFormat::V1);
        assert!(!cfg.log_json);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_dir() {
        assert!(VaultConfig::new("").validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_entry_name() {
        let cfg = VaultConfig {
            key_entry_name: "../../etc/passwd".into(),
            ..VaultConfig::new("/tmp/keys")
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn deserialises_from_source() {
        let cfg: VaultConfig = config::Config::builder()
            .set_override("key_store_dir", "/data/keys")
            .unwrap()
            .set_override("cipher_format", "legacy")
            .unwrap()
            .set_override("log_json", true)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.key_store_dir, PathBuf::from("/data/keys"));
        assert_eq!(cfg.cipher_format, CipherFormat::Legacy);
        assert_eq!(cfg.key_entry_name, "device-dek");
        assert!(cfg.log_json);
    }

    #[test]
    fn missing_dir_fails_deserialisation() {
        let result = config::Config::builder()
            .set_override("log_level", "debug")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<VaultConfig>();
        assert!(result.is_err());
    }
}
