//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while assembling a directory configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A config layer exists on disk but could not be read
    #[error("cannot read shardmeta config layer '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config layer is not valid TOML for the directory's settings
    #[error("malformed shardmeta config layer '{path}': {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A merged setting the directory cannot run with
    #[error("unusable setting '{key}': {message}")]
    InvalidSetting { key: String, message: String },

    /// Log subscriber installation failed
    #[error("cannot install log subscriber: {0}")]
    Logging(String),
}

impl ConfigError {
    pub fn invalid_setting(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            message: message.into(),
        }
    }
}
