//! ShardMeta Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.shardmeta/config.toml`
//! - Local config: `.shardmeta/config.toml` (in workspace)
//! - Caller overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → overrides.

mod error;
mod loader;
mod logging;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use logging::init_logging;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default shard identifier sequence name.
pub const DEFAULT_SHARD_ID_SEQUENCE: &str = "shard_id_sequence";

/// Default placement identifier sequence name.
pub const DEFAULT_PLACEMENT_ID_SEQUENCE: &str = "shard_placement_id_sequence";

/// Largest value a sequence can issue (identifiers are stored as signed
/// 64-bit integers).
pub const MAX_SEQUENCE_VALUE: u64 = i64::MAX as u64;

/// Root configuration for ShardMeta.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ShardMetaConfig {
    /// Catalog store configuration
    pub catalog: CatalogConfig,

    /// Partition key handling
    pub partitioning: PartitioningConfig,

    /// Identifier sequences
    pub sequences: SequenceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Catalog store configuration.
///
/// # Example TOML
///
/// ```toml
/// [catalog]
/// path = "shardmeta.db"
/// busy_timeout_ms = 5000
/// journal_mode = "wal"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Catalog database file (relative paths resolve against the workspace root)
    pub path: PathBuf,

    /// How long a connection waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,

    /// SQLite journal mode
    pub journal_mode: JournalMode,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("shardmeta.db"),
            busy_timeout_ms: 5_000,
            journal_mode: JournalMode::default(),
        }
    }
}

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    /// Write-ahead log (default)
    #[default]
    Wal,
    /// Rollback journal
    Delete,
}

impl JournalMode {
    /// Value for the `journal_mode` pragma.
    pub fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "WAL",
            Self::Delete => "DELETE",
        }
    }
}

/// Partition key configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PartitioningConfig {
    /// How partition keys are stored in the partition catalog
    pub key_encoding: KeyEncoding,
}

/// Storage encoding for partition keys.
///
/// Selected once per directory; both encodings decode to the same key
/// expression capability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum KeyEncoding {
    /// Store the human-readable column name and resolve it on demand
    ColumnName,
    /// Store a pre-serialized scalar expression (default)
    #[default]
    SerializedExpression,
}

impl std::fmt::Display for KeyEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ColumnName => write!(f, "column-name"),
            Self::SerializedExpression => write!(f, "serialized-expression"),
        }
    }
}

impl std::str::FromStr for KeyEncoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "column-name" | "column_name" | "name" => Ok(Self::ColumnName),
            "serialized-expression" | "serialized_expression" | "serialized" => {
                Ok(Self::SerializedExpression)
            }
            _ => Err(ConfigError::invalid_setting(
                "partitioning.key_encoding",
                format!(
                    "unknown encoding '{}'. Valid values: column-name, serialized-expression",
                    s
                ),
            )),
        }
    }
}

/// Identifier sequence configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SequenceConfig {
    /// Sequence supplying shard identifiers
    pub shard_id: String,

    /// First value issued by the shard identifier sequence
    pub shard_id_start: u64,

    /// Sequence supplying placement identifiers
    pub placement_id: String,

    /// First value issued by the placement identifier sequence
    pub placement_id_start: u64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            shard_id: DEFAULT_SHARD_ID_SEQUENCE.to_string(),
            shard_id_start: 10_000,
            placement_id: DEFAULT_PLACEMENT_ID_SEQUENCE.to_string(),
            placement_id_start: 1,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// Caller overrides for configuration values.
///
/// Used by the host integration to apply its own settings over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override catalog database path
    pub catalog_path: Option<PathBuf>,

    /// Override busy timeout
    pub busy_timeout_ms: Option<u64>,

    /// Override partition key encoding
    pub key_encoding: Option<KeyEncoding>,

    /// Override log level
    pub log_level: Option<String>,
}

impl ShardMetaConfig {
    /// Apply overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref path) = overrides.catalog_path {
            self.catalog.path = path.clone();
        }

        if let Some(timeout) = overrides.busy_timeout_ms {
            self.catalog.busy_timeout_ms = timeout;
        }

        if let Some(encoding) = overrides.key_encoding {
            self.partitioning.key_encoding = encoding;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.busy_timeout_ms == 0 {
            return Err(ConfigError::invalid_setting(
                "catalog.busy_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.sequences.shard_id.trim().is_empty() {
            return Err(ConfigError::invalid_setting(
                "sequences.shard_id",
                "a sequence name is required",
            ));
        }
        if self.sequences.placement_id.trim().is_empty() {
            return Err(ConfigError::invalid_setting(
                "sequences.placement_id",
                "a sequence name is required",
            ));
        }
        if self.sequences.shard_id == self.sequences.placement_id {
            return Err(ConfigError::invalid_setting(
                "sequences.placement_id",
                format!(
                    "shard and placement identifiers must use distinct sequences (both are '{}')",
                    self.sequences.shard_id
                ),
            ));
        }
        for (key, start) in [
            ("sequences.shard_id_start", self.sequences.shard_id_start),
            ("sequences.placement_id_start", self.sequences.placement_id_start),
        ] {
            if start > MAX_SEQUENCE_VALUE {
                return Err(ConfigError::invalid_setting(
                    key,
                    format!("{start} exceeds the largest identifier {MAX_SEQUENCE_VALUE}"),
                ));
            }
        }
        Ok(())
    }

    /// Get the effective catalog path for a workspace.
    pub fn catalog_path(&self, workspace_root: &Path) -> PathBuf {
        if self.catalog.path.is_absolute() {
            self.catalog.path.clone()
        } else {
            workspace_root.join(&self.catalog.path)
        }
    }
}
