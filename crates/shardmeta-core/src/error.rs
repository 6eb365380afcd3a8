//! Directory error types.

use crate::types::{PlacementId, ShardId, TableId};
use crate::value::ValueType;
use shardmeta_config::ConfigError;
use thiserror::Error;

/// Errors surfaced by directory operations.
///
/// None of these are retried internally; every failure aborts the current
/// operation and leaves no partial state behind.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The table has no partitioning record
    #[error("no partition column is defined for table {table_id}")]
    NotDistributed { table_id: TableId },

    /// The table is not known to the relation registry
    #[error("relation with id {table_id} does not exist")]
    UndefinedTable { table_id: TableId },

    /// Column name does not exist on the table
    #[error("column \"{column}\" of relation \"{table}\" does not exist")]
    UndefinedColumn { table: String, column: String },

    /// Column name refers to a reserved system column
    #[error("column \"{column}\" of relation \"{table}\" is a system column")]
    SystemColumnReference { table: String, column: String },

    /// No shard row exists for the identifier
    #[error("shard with ID {shard_id} does not exist")]
    ShardNotFound { shard_id: ShardId },

    /// The shard has no placements
    #[error("no placements exist for shard with ID {shard_id}")]
    ShardNotPlaced { shard_id: ShardId },

    /// No placement row exists for the identifier
    #[error("shard placement with ID {placement_id} does not exist")]
    PlacementNotFound { placement_id: PlacementId },

    /// Lock mode other than share or exclusive
    #[error("lock mode must be one of: ExclusiveLock, ShareLock (got {mode})")]
    InvalidLockMode { mode: String },

    /// Named sequence does not exist
    #[error("sequence \"{name}\" does not exist")]
    SequenceNotFound { name: String },

    /// Next value would exceed the largest storable identifier
    #[error("sequence \"{name}\" has reached its maximum value")]
    SequenceExhausted { name: String },

    /// Sequence start outside the storable identifier range
    #[error("start value {start} of sequence \"{name}\" exceeds {max}", max = i64::MAX)]
    InvalidSequenceStart { name: String, start: u64 },

    /// Stored shard boundaries cannot be interpreted
    #[error("invalid boundary for shard {shard_id}: {message}")]
    InvalidShardBoundary { shard_id: ShardId, message: String },

    /// Key expression cannot be stored under the configured encoding
    #[error("unsupported partition key expression: {0}")]
    UnsupportedKeyExpression(String),

    /// Relation definition rejected by the registry
    #[error("invalid relation definition: {0}")]
    InvalidRelation(String),

    /// Text does not convert to a value of the requested type
    #[error("invalid input syntax for type {value_type}: \"{input}\"")]
    InvalidValue { value_type: ValueType, input: String },

    /// A catalog row holds data this crate cannot decode
    #[error("corrupt row in {table}: {message}")]
    CorruptRow { table: String, message: String },

    /// Catalog schema version mismatch
    #[error("catalog schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: String, found: String },

    /// Underlying catalog store failure
    #[error("catalog error: {0}")]
    Catalog(#[from] rusqlite::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl DirectoryError {
    /// Create an UndefinedColumn error.
    pub fn undefined_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UndefinedColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create a SystemColumnReference error.
    pub fn system_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::SystemColumnReference {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create an InvalidValue error.
    pub fn invalid_value(value_type: ValueType, input: impl Into<String>) -> Self {
        Self::InvalidValue {
            value_type,
            input: input.into(),
        }
    }

    /// Create a CorruptRow error.
    pub fn corrupt_row(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CorruptRow {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidShardBoundary error.
    pub fn invalid_boundary(shard_id: ShardId, message: impl Into<String>) -> Self {
        Self::InvalidShardBoundary {
            shard_id,
            message: message.into(),
        }
    }
}

/// Result type for directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;
