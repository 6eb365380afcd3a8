//! Shard Directory
//!
//! [`ShardDirectory`] owns the services shared across transactions (the shard
//! interval cache and the lock manager) together with the configuration.
//! Every directory operation runs inside a [`DirectoryTransaction`], which
//! pairs a catalog transaction with the transaction's shard locks.
//!
//! ```ignore
//! let directory = ShardDirectory::new(config);
//! let mut catalog = directory.open_workspace_catalog(&root)?;
//!
//! let txn = directory.begin(&mut catalog)?;
//! let shard_id = txn.next_shard_id()?;
//! txn.lock_shard(shard_id, LockMode::Exclusive)?;
//! txn.insert_shard_row(table_id, shard_id, ShardStorage::Table, Some("0"), Some("99"))?;
//! txn.commit()?;
//! ```

use crate::cache::ShardIntervalCache;
use crate::catalog::{CatalogStore, SqliteCatalog};
use crate::error::{DirectoryError, Result};
use crate::interval::{self, ShardInterval};
use crate::key::KeyExpression;
use crate::lock::{ShardLockManager, TransactionLocks};
use crate::mutate::MetadataWriter;
use crate::placement::{self, ShardPlacement};
use crate::relation::Relation;
use crate::resolver::PartitionResolver;
use crate::sequence;
use crate::types::{
    LockMode, PartitionMethod, PlacementId, ShardId, ShardState, ShardStorage, TableId, TxnId,
};
use rusqlite::{Connection, Transaction};
use shardmeta_config::{ConfigLoader, ConfigOverrides, ShardMetaConfig};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Handle to a shard metadata directory.
///
/// The handle is `Sync`: threads share one directory and each opens its own
/// [`SqliteCatalog`] to run transactions against.
pub struct ShardDirectory {
    config: ShardMetaConfig,
    cache: Arc<ShardIntervalCache>,
    locks: Arc<ShardLockManager>,
    next_txn: AtomicU64,
}

impl ShardDirectory {
    /// Create a directory with fresh cache and lock services.
    pub fn new(config: ShardMetaConfig) -> Self {
        Self::with_services(
            config,
            Arc::new(ShardIntervalCache::new()),
            Arc::new(ShardLockManager::new()),
        )
    }

    /// Create a directory around existing cache and lock services.
    pub fn with_services(
        config: ShardMetaConfig,
        cache: Arc<ShardIntervalCache>,
        locks: Arc<ShardLockManager>,
    ) -> Self {
        Self {
            config,
            cache,
            locks,
            next_txn: AtomicU64::new(1),
        }
    }

    /// Load configuration for a workspace (global → local → overrides) and
    /// create a directory from it.
    pub fn load(workspace_root: &Path, overrides: Option<&ConfigOverrides>) -> Result<Self> {
        let config = ConfigLoader::new().load(workspace_root, overrides)?;
        info!(
            "Shard directory configured with {} key encoding",
            config.partitioning.key_encoding
        );
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &ShardMetaConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ShardIntervalCache> {
        &self.cache
    }

    pub fn locks(&self) -> &Arc<ShardLockManager> {
        &self.locks
    }

    /// Open a catalog database and create the configured identifier sequences.
    pub fn open_catalog(&self, path: &Path) -> Result<SqliteCatalog> {
        let catalog = SqliteCatalog::open(path, &self.config.catalog)?;
        catalog.bootstrap_sequences(&self.config.sequences)?;
        Ok(catalog)
    }

    /// Open the catalog configured for a workspace.
    pub fn open_workspace_catalog(&self, workspace_root: &Path) -> Result<SqliteCatalog> {
        self.open_catalog(&self.config.catalog_path(workspace_root))
    }

    /// Open a private in-memory catalog (for testing)
    pub fn open_in_memory_catalog(&self) -> Result<SqliteCatalog> {
        let catalog = SqliteCatalog::in_memory()?;
        catalog.bootstrap_sequences(&self.config.sequences)?;
        Ok(catalog)
    }

    /// Begin a transaction on `catalog`.
    pub fn begin<'d, 'c>(
        &'d self,
        catalog: &'c mut SqliteCatalog,
    ) -> Result<DirectoryTransaction<'d, 'c>> {
        let (tx, sequences) = catalog.transaction()?;
        let id = TxnId(self.next_txn.fetch_add(1, Ordering::Relaxed));
        debug!("Began directory transaction {}", id);

        Ok(DirectoryTransaction {
            tx,
            sequences,
            locks: TransactionLocks::new(&self.locks, id),
            directory: self,
        })
    }
}

/// One directory transaction.
///
/// Dropping the handle without committing rolls back its catalog writes and
/// releases its shard locks. Identifiers drawn through it stay consumed.
pub struct DirectoryTransaction<'d, 'c> {
    // Field order is drop order: roll back first, then release locks.
    tx: Transaction<'c>,
    sequences: &'c Connection,
    locks: TransactionLocks<'d>,
    directory: &'d ShardDirectory,
}

impl<'d, 'c> DirectoryTransaction<'d, 'c> {
    pub fn id(&self) -> TxnId {
        self.locks.txn()
    }

    fn store(&self) -> &Connection {
        &self.tx
    }

    fn resolver(&self) -> PartitionResolver<'_, Connection> {
        PartitionResolver::new(self.store(), self.directory.config.partitioning.key_encoding)
    }

    fn writer(&self) -> MetadataWriter<'_, Connection> {
        MetadataWriter::new(self.store(), self.directory.config.partitioning.key_encoding)
    }

    // =========================================================================
    // Partitioning
    // =========================================================================

    pub fn resolve_partition_method(&self, table_id: TableId) -> Result<PartitionMethod> {
        self.resolver().partition_method(table_id)
    }

    pub fn resolve_partition_key(&self, table_id: TableId) -> Result<KeyExpression> {
        self.resolver().partition_key(table_id)
    }

    pub fn column_reference(&self, table_id: TableId, column_name: &str) -> Result<KeyExpression> {
        self.resolver().column_reference(table_id, column_name)
    }

    pub fn is_distributed_table(&self, table_id: TableId) -> Result<bool> {
        self.resolver().is_distributed_table(table_id)
    }

    pub fn distributed_tables_exist(&self) -> Result<bool> {
        self.resolver().distributed_tables_exist()
    }

    pub fn partition_key_to_node_string(&self, table_id: TableId) -> Result<String> {
        self.resolver().partition_key_to_node_string(table_id)
    }

    pub fn column_name_to_node_string(&self, table_id: TableId, column_name: &str) -> Result<String> {
        self.resolver().column_name_to_node_string(table_id, column_name)
    }

    pub fn node_string_to_column_name(&self, table_id: TableId, node_string: &str) -> Result<String> {
        self.resolver().node_string_to_column_name(table_id, node_string)
    }

    // =========================================================================
    // Shard intervals and placements
    // =========================================================================

    /// Shard intervals of a table through the directory's cache.
    ///
    /// The first non-empty result is kept for the directory's lifetime; use
    /// [`Self::load_shard_interval_list`] for a fresh view.
    pub fn get_shard_intervals(&self, table_id: TableId) -> Result<Arc<[ShardInterval]>> {
        self.directory
            .cache
            .get_or_load(table_id, || self.load_shard_interval_list(table_id))
    }

    pub fn load_shard_interval_list(&self, table_id: TableId) -> Result<Vec<ShardInterval>> {
        interval::load_shard_interval_list(&self.resolver(), self.store(), table_id)
    }

    pub fn load_shard_interval(&self, shard_id: ShardId) -> Result<ShardInterval> {
        interval::load_shard_interval(&self.resolver(), self.store(), shard_id)
    }

    pub fn load_placements(&self, shard_id: ShardId) -> Result<Vec<ShardPlacement>> {
        placement::load_placements(self.store(), shard_id)
    }

    pub fn load_finalized_placements(&self, shard_id: ShardId) -> Result<Vec<ShardPlacement>> {
        placement::load_finalized_placements(self.store(), shard_id)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn insert_partition_row(
        &self,
        table_id: TableId,
        method: PartitionMethod,
        key: &KeyExpression,
    ) -> Result<()> {
        self.writer().insert_partition_row(table_id, method, key)
    }

    pub fn insert_shard_row(
        &self,
        table_id: TableId,
        shard_id: ShardId,
        storage: ShardStorage,
        min_value: Option<&str>,
        max_value: Option<&str>,
    ) -> Result<()> {
        self.writer()
            .insert_shard_row(table_id, shard_id, storage, min_value, max_value)
    }

    pub fn insert_shard_placement_row(
        &self,
        placement_id: PlacementId,
        shard_id: ShardId,
        state: ShardState,
        node_name: &str,
        node_port: u32,
    ) -> Result<()> {
        self.writer()
            .insert_shard_placement_row(placement_id, shard_id, state, node_name, node_port)
    }

    pub fn delete_shard_placement_row(&self, placement_id: PlacementId) -> Result<()> {
        self.writer().delete_shard_placement_row(placement_id)
    }

    /// Register or replace a relation definition.
    pub fn register_relation(&self, relation: &Relation) -> Result<()> {
        self.store().insert_relation(relation)
    }

    pub fn lookup_relation(&self, table_id: TableId) -> Result<Relation> {
        self.store()
            .relation(table_id)?
            .ok_or(DirectoryError::UndefinedTable { table_id })
    }

    // =========================================================================
    // Locks and sequences
    // =========================================================================

    /// Lock a shard until this transaction ends. Blocks while another
    /// transaction holds a conflicting lock.
    pub fn lock_shard(&self, shard_id: ShardId, mode: LockMode) -> Result<()> {
        self.locks.lock_shard(shard_id, mode)
    }

    /// Strongest mode this transaction holds on a shard.
    pub fn held_lock(&self, shard_id: ShardId) -> Option<LockMode> {
        self.locks.held_mode(shard_id)
    }

    /// Draw the next value of a sequence. Never blocks on other
    /// transactions and is not undone by rollback.
    pub fn next_id(&self, sequence_name: &str) -> Result<u64> {
        sequence::next_id(self.sequences, sequence_name)
    }

    pub fn next_shard_id(&self) -> Result<ShardId> {
        self.next_id(&self.directory.config.sequences.shard_id)
            .map(ShardId)
    }

    pub fn next_placement_id(&self) -> Result<PlacementId> {
        self.next_id(&self.directory.config.sequences.placement_id)
            .map(PlacementId)
    }

    pub fn create_sequence(&self, sequence_name: &str, start: u64) -> Result<bool> {
        sequence::create_sequence(self.sequences, sequence_name, start)
    }

    // =========================================================================
    // Completion
    // =========================================================================

    /// Commit catalog writes, then release shard locks.
    pub fn commit(self) -> Result<()> {
        let Self { tx, locks, .. } = self;
        tx.commit()?;
        debug!("Committed directory transaction {}", locks.txn());
        drop(locks);
        Ok(())
    }

    /// Discard catalog writes, then release shard locks.
    pub fn rollback(self) -> Result<()> {
        let Self { tx, locks, .. } = self;
        tx.rollback()?;
        debug!("Rolled back directory transaction {}", locks.txn());
        drop(locks);
        Ok(())
    }
}
