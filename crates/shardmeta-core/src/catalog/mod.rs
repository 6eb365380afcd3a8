//! Catalog Row Store
//!
//! The directory reads and writes its records through [`CatalogStore`]: point
//! lookups by primary key and scans by secondary key. The trait is implemented
//! for [`rusqlite::Connection`], so a live transaction (which derefs to its
//! connection) serves reads of its own uncommitted writes.
//!
//! Identifier sequences live behind [`SequenceStore`] in a separate database
//! that is only ever written in autocommit mode: an issued value stays issued
//! whatever happens to the transaction that drew it.

pub mod schema;
mod sqlite;

pub use sqlite::{sequence_store_path, SqliteCatalog};

use crate::error::{DirectoryError, Result};
use crate::placement::ShardPlacement;
use crate::relation::{ColumnDef, Relation};
use crate::types::{PartitionMethod, PlacementId, ShardId, ShardState, ShardStorage, TableId};
use crate::value::ValueType;
use rusqlite::{params, Connection, OptionalExtension};
use schema::{PLACEMENT_COLUMNS, SHARD_COLUMNS};
use tracing::trace;

/// A row of the partition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRow {
    pub table_id: TableId,
    pub method: PartitionMethod,
    /// Column name or serialized expression, per the key encoding
    pub partition_key: String,
}

/// A row of the shard table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardRow {
    pub shard_id: ShardId,
    pub table_id: TableId,
    pub storage: ShardStorage,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
}

/// Storage backend for the directory's catalog tables.
pub trait CatalogStore {
    /// Partition row of a table.
    fn partition_row(&self, table_id: TableId) -> Result<Option<PartitionRow>>;

    /// Whether any partition row exists.
    fn has_partition_rows(&self) -> Result<bool>;

    fn insert_partition_row(&self, row: &PartitionRow) -> Result<()>;

    /// Shard row by shard id.
    fn shard_row(&self, shard_id: ShardId) -> Result<Option<ShardRow>>;

    /// Ids of a table's shards, ascending.
    fn shard_ids_for_table(&self, table_id: TableId) -> Result<Vec<ShardId>>;

    fn insert_shard_row(&self, row: &ShardRow) -> Result<()>;

    /// Placement row by placement id.
    fn placement_row(&self, placement_id: PlacementId) -> Result<Option<ShardPlacement>>;

    /// Placements of a shard, ascending by placement id.
    fn placements_for_shard(&self, shard_id: ShardId) -> Result<Vec<ShardPlacement>>;

    fn insert_placement_row(&self, placement: &ShardPlacement) -> Result<()>;

    /// Delete a placement row; returns false when no such row exists.
    fn delete_placement_row(&self, placement_id: PlacementId) -> Result<bool>;

    /// Registered relation by table id.
    fn relation(&self, table_id: TableId) -> Result<Option<Relation>>;

    /// Register a relation, replacing any earlier definition with the same id.
    fn insert_relation(&self, relation: &Relation) -> Result<()>;
}

// Identifiers are unsigned 64-bit; SQLite integers are signed. Bit-cast in
// both directions so the full range survives.
fn id_to_sql(id: u64) -> i64 {
    id as i64
}

fn id_from_sql(value: i64) -> u64 {
    value as u64
}

fn single_char(table: &str, column: &str, text: &str) -> Result<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(DirectoryError::corrupt_row(
            table,
            format!("{column} must be a single character, got {text:?}"),
        )),
    }
}

impl PartitionRow {
    fn from_raw(table_id: i64, method: String, partition_key: String) -> Result<Self> {
        let code = single_char("dist_partition", "partition_method", &method)?;
        let method = PartitionMethod::from_code(code).ok_or_else(|| {
            DirectoryError::corrupt_row(
                "dist_partition",
                format!("unknown partition method '{code}'"),
            )
        })?;
        let table_id = u32::try_from(table_id).map_err(|_| {
            DirectoryError::corrupt_row("dist_partition", format!("table id {table_id} out of range"))
        })?;

        Ok(Self {
            table_id: TableId(table_id),
            method,
            partition_key,
        })
    }
}

type RawShard = (i64, i64, String, Option<String>, Option<String>);

impl ShardRow {
    fn from_raw((shard_id, table_id, storage, min_value, max_value): RawShard) -> Result<Self> {
        let code = single_char("dist_shard", "storage_kind", &storage)?;
        let storage = ShardStorage::from_code(code).ok_or_else(|| {
            DirectoryError::corrupt_row("dist_shard", format!("unknown storage kind '{code}'"))
        })?;
        let table_id = u32::try_from(table_id).map_err(|_| {
            DirectoryError::corrupt_row("dist_shard", format!("table id {table_id} out of range"))
        })?;

        Ok(Self {
            shard_id: ShardId(id_from_sql(shard_id)),
            table_id: TableId(table_id),
            storage,
            min_value,
            max_value,
        })
    }
}

type RawPlacement = (i64, i64, i32, String, i64);

fn placement_from_raw(
    (placement_id, shard_id, state, node_name, node_port): RawPlacement,
) -> Result<ShardPlacement> {
    let state = ShardState::from_code(state).ok_or_else(|| {
        DirectoryError::corrupt_row("dist_shard_placement", format!("unknown shard state {state}"))
    })?;
    let node_port = u32::try_from(node_port).map_err(|_| {
        DirectoryError::corrupt_row(
            "dist_shard_placement",
            format!("node port {node_port} out of range"),
        )
    })?;

    Ok(ShardPlacement {
        id: PlacementId(id_from_sql(placement_id)),
        shard_id: ShardId(id_from_sql(shard_id)),
        state,
        node_name,
        node_port,
    })
}

impl CatalogStore for Connection {
    fn partition_row(&self, table_id: TableId) -> Result<Option<PartitionRow>> {
        let raw: Option<(i64, String, String)> = self
            .query_row(
                "SELECT table_id, partition_method, partition_key FROM dist_partition \
                 WHERE table_id = ?1",
                [i64::from(table_id.0)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        raw.map(|(id, method, key)| PartitionRow::from_raw(id, method, key))
            .transpose()
    }

    fn has_partition_rows(&self) -> Result<bool> {
        let exists: bool = self.query_row(
            "SELECT EXISTS (SELECT 1 FROM dist_partition)",
            [],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn insert_partition_row(&self, row: &PartitionRow) -> Result<()> {
        self.execute(
            "INSERT INTO dist_partition (table_id, partition_method, partition_key) \
             VALUES (?1, ?2, ?3)",
            params![
                i64::from(row.table_id.0),
                row.method.code().to_string(),
                row.partition_key
            ],
        )?;
        Ok(())
    }

    fn shard_row(&self, shard_id: ShardId) -> Result<Option<ShardRow>> {
        let raw: Option<RawShard> = self
            .query_row(
                &format!("SELECT {SHARD_COLUMNS} FROM dist_shard WHERE shard_id = ?1"),
                [id_to_sql(shard_id.0)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;

        raw.map(ShardRow::from_raw).transpose()
    }

    fn shard_ids_for_table(&self, table_id: TableId) -> Result<Vec<ShardId>> {
        let mut stmt = self.prepare_cached("SELECT shard_id FROM dist_shard WHERE table_id = ?1")?;
        let mut ids = stmt
            .query_map([i64::from(table_id.0)], |row| row.get::<_, i64>(0))?
            .map(|id| id.map(|id| ShardId(id_from_sql(id))))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        ids.sort_unstable();

        trace!(table_id = %table_id, shards = ids.len(), "scanned shard index");
        Ok(ids)
    }

    fn insert_shard_row(&self, row: &ShardRow) -> Result<()> {
        self.execute(
            &format!("INSERT INTO dist_shard ({SHARD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            params![
                id_to_sql(row.shard_id.0),
                i64::from(row.table_id.0),
                row.storage.code().to_string(),
                row.min_value,
                row.max_value
            ],
        )?;
        Ok(())
    }

    fn placement_row(&self, placement_id: PlacementId) -> Result<Option<ShardPlacement>> {
        let raw: Option<RawPlacement> = self
            .query_row(
                &format!(
                    "SELECT {PLACEMENT_COLUMNS} FROM dist_shard_placement WHERE placement_id = ?1"
                ),
                [id_to_sql(placement_id.0)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;

        raw.map(placement_from_raw).transpose()
    }

    fn placements_for_shard(&self, shard_id: ShardId) -> Result<Vec<ShardPlacement>> {
        let mut stmt = self.prepare_cached(&format!(
            "SELECT {PLACEMENT_COLUMNS} FROM dist_shard_placement WHERE shard_id = ?1"
        ))?;
        let raw = stmt
            .query_map([id_to_sql(shard_id.0)], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<rusqlite::Result<Vec<RawPlacement>>>()?;

        let mut placements = raw
            .into_iter()
            .map(placement_from_raw)
            .collect::<Result<Vec<_>>>()?;
        placements.sort_unstable_by_key(|p| p.id);

        trace!(shard_id = %shard_id, placements = placements.len(), "scanned placement index");
        Ok(placements)
    }

    fn insert_placement_row(&self, placement: &ShardPlacement) -> Result<()> {
        self.execute(
            &format!(
                "INSERT INTO dist_shard_placement ({PLACEMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"
            ),
            params![
                id_to_sql(placement.id.0),
                id_to_sql(placement.shard_id.0),
                placement.state.code(),
                placement.node_name,
                i64::from(placement.node_port)
            ],
        )?;
        Ok(())
    }

    fn delete_placement_row(&self, placement_id: PlacementId) -> Result<bool> {
        let deleted = self.execute(
            "DELETE FROM dist_shard_placement WHERE placement_id = ?1",
            [id_to_sql(placement_id.0)],
        )?;
        Ok(deleted > 0)
    }

    fn relation(&self, table_id: TableId) -> Result<Option<Relation>> {
        let name: Option<String> = self
            .query_row(
                "SELECT name FROM dist_relation WHERE table_id = ?1",
                [i64::from(table_id.0)],
                |row| row.get(0),
            )
            .optional()?;
        let Some(name) = name else {
            return Ok(None);
        };

        let mut stmt = self.prepare_cached(
            "SELECT name, attnum, value_type FROM dist_relation_column \
             WHERE table_id = ?1 ORDER BY attnum",
        )?;
        let raw = stmt
            .query_map([i64::from(table_id.0)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i16>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let columns = raw
            .into_iter()
            .map(|(column, attnum, value_type)| -> Result<ColumnDef> {
                let value_type = value_type.parse::<ValueType>().map_err(|_| {
                    DirectoryError::corrupt_row(
                        "dist_relation_column",
                        format!("unknown type \"{value_type}\" for column \"{column}\""),
                    )
                })?;
                Ok(ColumnDef::new(column, attnum, value_type))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Relation {
            id: table_id,
            name,
            columns,
        }))
    }

    fn insert_relation(&self, relation: &Relation) -> Result<()> {
        relation.validate()?;
        let table_id = i64::from(relation.id.0);

        self.execute(
            "INSERT OR REPLACE INTO dist_relation (table_id, name) VALUES (?1, ?2)",
            params![table_id, relation.name],
        )?;
        self.execute(
            "DELETE FROM dist_relation_column WHERE table_id = ?1",
            [table_id],
        )?;

        let mut stmt = self.prepare_cached(
            "INSERT INTO dist_relation_column (table_id, attnum, name, value_type) \
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for column in &relation.columns {
            stmt.execute(params![
                table_id,
                column.attnum,
                column.name,
                column.value_type.name()
            ])?;
        }
        Ok(())
    }
}

/// Storage backend for identifier sequences.
pub trait SequenceStore {
    /// Advance a sequence; `None` when the sequence does not exist.
    fn next_sequence_value(&self, name: &str) -> Result<Option<u64>>;

    /// Create a sequence; returns false when it already exists.
    fn create_sequence(&self, name: &str, start: u64) -> Result<bool>;
}

impl SequenceStore for Connection {
    fn next_sequence_value(&self, name: &str) -> Result<Option<u64>> {
        // The guard leaves the row untouched instead of overflowing past i64::MAX.
        let value: Option<i64> = self
            .query_row(
                "UPDATE dist_sequence SET last_value = CASE \
                     WHEN last_value IS NULL THEN start_value \
                     ELSE last_value + increment END \
                 WHERE name = ?1 \
                   AND (last_value IS NULL OR last_value <= 9223372036854775807 - increment) \
                 RETURNING last_value",
                [name],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(value) => u64::try_from(value).map(Some).map_err(|_| {
                DirectoryError::corrupt_row("dist_sequence", format!("negative value {value}"))
            }),
            None => {
                let exists: bool = self.query_row(
                    "SELECT EXISTS (SELECT 1 FROM dist_sequence WHERE name = ?1)",
                    [name],
                    |row| row.get(0),
                )?;
                if exists {
                    Err(DirectoryError::SequenceExhausted {
                        name: name.to_string(),
                    })
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn create_sequence(&self, name: &str, start: u64) -> Result<bool> {
        let start_value =
            i64::try_from(start).map_err(|_| DirectoryError::InvalidSequenceStart {
                name: name.to_string(),
                start,
            })?;
        let inserted = self.execute(
            "INSERT OR IGNORE INTO dist_sequence (name, start_value) VALUES (?1, ?2)",
            params![name, start_value],
        )?;
        Ok(inserted > 0)
    }
}
