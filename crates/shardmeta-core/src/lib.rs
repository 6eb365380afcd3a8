//! ShardMeta Core
//!
//! Metadata directory for sharded tables. Tracks how each distributed table is
//! partitioned, the boundary interval of every shard, and the node placements
//! holding each shard's data, and provides the locking and identifier
//! allocation primitives that make shard creation safe.
//!
//! ## Modules
//!
//! - [`catalog`]: Catalog and sequence store traits and their SQLite implementation
//! - [`resolver`]: Partition method, partition key and column resolution
//! - [`interval`]: Shard interval loading
//! - [`placement`]: Shard placement loading
//! - [`cache`]: Per-table shard interval cache
//! - [`mutate`]: Partition, shard and placement writers
//! - [`lock`]: Advisory shard locks
//! - [`sequence`]: Identifier sequences
//! - [`directory`]: Directory handle and transactions tying the above together

pub mod cache;
pub mod catalog;
pub mod directory;
pub mod error;
pub mod interval;
pub mod key;
pub mod lock;
pub mod mutate;
pub mod placement;
pub mod relation;
pub mod resolver;
pub mod sequence;
pub mod types;
pub mod value;

pub use cache::{CacheMetrics, ShardIntervalCache};
pub use catalog::{CatalogStore, PartitionRow, SequenceStore, ShardRow, SqliteCatalog};
pub use directory::{DirectoryTransaction, ShardDirectory};
pub use error::{DirectoryError, Result};
pub use interval::ShardInterval;
pub use key::{ColumnRef, KeyExpression, ScalarExpr, SerializedExpression};
pub use lock::{ShardLockManager, TransactionLocks};
pub use mutate::MetadataWriter;
pub use placement::ShardPlacement;
pub use relation::{ColumnDef, Relation, SYSTEM_COLUMNS};
pub use resolver::PartitionResolver;
pub use types::{
    LockMode, PartitionMethod, PlacementId, ShardId, ShardState, ShardStorage, TableId, TxnId,
};
pub use value::{Value, ValueType};

pub use shardmeta_config::{KeyEncoding, ShardMetaConfig};
