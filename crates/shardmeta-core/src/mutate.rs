//! Metadata mutators.
//!
//! Writes go straight to the catalog store and are visible to later reads in
//! the same transaction. None of them take shard locks.

use crate::catalog::{CatalogStore, PartitionRow, ShardRow};
use crate::error::{DirectoryError, Result};
use crate::key::KeyExpression;
use crate::placement::ShardPlacement;
use crate::types::{PartitionMethod, PlacementId, ShardId, ShardState, ShardStorage, TableId};
use shardmeta_config::KeyEncoding;
use tracing::debug;

/// Writes partition, shard and placement rows.
pub struct MetadataWriter<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
    encoding: KeyEncoding,
}

impl<'a, S: CatalogStore + ?Sized> MetadataWriter<'a, S> {
    pub fn new(store: &'a S, encoding: KeyEncoding) -> Self {
        Self { store, encoding }
    }

    /// Record a table's partitioning scheme.
    ///
    /// Under [`KeyEncoding::ColumnName`] the key must be a bare column.
    pub fn insert_partition_row(
        &self,
        table_id: TableId,
        method: PartitionMethod,
        key: &KeyExpression,
    ) -> Result<()> {
        let partition_key = match self.encoding {
            KeyEncoding::ColumnName if key.is_bare_column() => key.column().name.clone(),
            KeyEncoding::ColumnName => {
                return Err(DirectoryError::UnsupportedKeyExpression(format!(
                    "column-name encoding cannot store {}",
                    key.to_node_string()?
                )))
            }
            KeyEncoding::SerializedExpression => key.to_node_string()?,
        };

        self.store.insert_partition_row(&PartitionRow {
            table_id,
            method,
            partition_key,
        })?;
        debug!(
            "Inserted partition row for table {} ({:?})",
            table_id, method
        );
        Ok(())
    }

    /// Record a shard. Bounds are stored only as a pair: if either is missing,
    /// both are stored as NULL.
    pub fn insert_shard_row(
        &self,
        table_id: TableId,
        shard_id: ShardId,
        storage: ShardStorage,
        min_value: Option<&str>,
        max_value: Option<&str>,
    ) -> Result<()> {
        let (min_value, max_value) = match (min_value, max_value) {
            (Some(min), Some(max)) => (Some(min.to_string()), Some(max.to_string())),
            _ => (None, None),
        };

        self.store.insert_shard_row(&ShardRow {
            shard_id,
            table_id,
            storage,
            min_value,
            max_value,
        })?;
        debug!("Inserted shard {} for table {}", shard_id, table_id);
        Ok(())
    }

    /// Record a shard placement.
    pub fn insert_shard_placement_row(
        &self,
        placement_id: PlacementId,
        shard_id: ShardId,
        state: ShardState,
        node_name: &str,
        node_port: u32,
    ) -> Result<()> {
        self.store.insert_placement_row(&ShardPlacement {
            id: placement_id,
            shard_id,
            state,
            node_name: node_name.to_string(),
            node_port,
        })?;
        debug!(
            "Inserted placement {} of shard {} on {}:{}",
            placement_id, shard_id, node_name, node_port
        );
        Ok(())
    }

    /// Remove exactly one placement.
    pub fn delete_shard_placement_row(&self, placement_id: PlacementId) -> Result<()> {
        if !self.store.delete_placement_row(placement_id)? {
            return Err(DirectoryError::PlacementNotFound { placement_id });
        }
        debug!("Deleted placement {}", placement_id);
        Ok(())
    }
}
