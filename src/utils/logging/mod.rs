//! Logging utilities
//!
//! Installs the `tracing` subscriber used by the engine. `RUST_LOG` always
//! wins over the configured level so operators can raise verbosity per module.

use crate::config::LoggingConfig;
use crate::utils::error::{BatchError, Result};
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber
///
/// Returns an error if the level string is not a valid filter directive.
/// Calling this more than once is harmless: later calls leave the first
/// subscriber in place.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            BatchError::config(format!("Invalid log level '{}': {}", config.level, e))
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    let installed = if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(level = %config.level, json = config.json, "Tracing initialized");
    }
    Ok(())
}
