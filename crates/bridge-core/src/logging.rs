//! Log output initialization

use crate::config::LoggingConfig;
use crate::error::{BridgeError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` takes precedence over the configured filter directive.
///
/// # Errors
/// Returns `BridgeError::Logging` if the directive is invalid or a global
/// subscriber is already installed
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };
    installed.map_err(|err| BridgeError::Logging(err.to_string()))?;

    tracing::debug!(filter = %config.filter, json = config.json, "logging initialized");
    Ok(())
}

fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|err| BridgeError::Logging(err.to_string())),
    }
}
