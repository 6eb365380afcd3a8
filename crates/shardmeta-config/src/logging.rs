//! Tracing subscriber setup.
//!
//! The directory itself only emits `tracing` events; the embedding host calls
//! [`init_logging`] once at startup to route them to stderr.

use crate::error::ConfigError;
use crate::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber for the given logging configuration.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match config.format {
        LogFormat::Text => builder.with_ansi(true).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}

/// Build the level filter, preferring `RUST_LOG` over the configured level.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.level)
        .map_err(|e| ConfigError::invalid_setting("logging.level", e.to_string()))
}
