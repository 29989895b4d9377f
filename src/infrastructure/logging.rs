//! tracing subscriber setup

use super::config::LoggingConfig;
use crate::error::{BeadError, Result};
use tracing_subscriber::EnvFilter;

/**
 * Install the global tracing subscriber
 *
 * `RUST_LOG` wins over the configured level when set.
 *
 * # Returns
 *
 * `false` when a global subscriber was already installed.
 *
 * # Errors
 *
 * `BeadError::Config` when the level is not a valid filter directive.
 */
pub fn init_logging(config: &LoggingConfig) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| BeadError::Config(format!("log level {}: {}", config.level, e)))?,
    };

    let installed = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    };
    if installed {
        tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    }
    Ok(installed)
}
