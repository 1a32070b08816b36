//! Tracing subscriber initialisation.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::VaultConfig;

/// Initialise the global tracing subscriber.
///
/// Installs an [`EnvFilter`] (from `RUST_LOG`, falling back to `log_level`)
/// and a fmt layer writing JSON when `json` is set, plain text otherwise.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    installed.context("failed to initialise tracing subscriber")
}

/// [`init_tracing`] using the logging settings of `cfg`.
pub fn init_from_config(cfg: &VaultConfig) -> Result<()> {
    init_tracing(&cfg.log_level, cfg.log_json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_fails() {
        // Whichever test installs first wins; a second install must error.
        let _ = init_tracing("debug", true);
        assert!(init_from_config(&VaultConfig::new("/tmp/keys")).is_err());
    }
}
