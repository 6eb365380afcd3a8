//! Shard Interval Loader
//!
//! Converts shard rows into typed boundary intervals. Boundaries of hash
//! partitioned tables are 32-bit hash tokens; every other table's boundaries
//! take the type of its partition key.

use crate::catalog::{CatalogStore, ShardRow};
use crate::error::{DirectoryError, Result};
use crate::resolver::PartitionResolver;
use crate::types::{ShardId, ShardStorage, TableId};
use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Boundary interval of one shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardInterval {
    pub id: ShardId,
    pub table_id: TableId,
    pub storage: ShardStorage,
    /// Inclusive lower bound; `None` when the boundary is open
    pub min_value: Option<Value>,
    /// Inclusive upper bound; `None` when the boundary is open
    pub max_value: Option<Value>,
    pub value_type: ValueType,
}

impl ShardInterval {
    /// Whether `value` falls inside the interval. Open bounds are unbounded.
    pub fn contains(&self, value: &Value) -> bool {
        let above_min = self.min_value.as_ref().map_or(true, |min| value >= min);
        let below_max = self.max_value.as_ref().map_or(true, |max| value <= max);
        above_min && below_max
    }

    /// Whether both boundaries are set.
    pub fn has_bounds(&self) -> bool {
        self.min_value.is_some() && self.max_value.is_some()
    }
}

/// Load one shard's interval.
pub fn load_shard_interval<S: CatalogStore + ?Sized>(
    resolver: &PartitionResolver<'_, S>,
    store: &S,
    shard_id: ShardId,
) -> Result<ShardInterval> {
    let row = store
        .shard_row(shard_id)?
        .ok_or(DirectoryError::ShardNotFound { shard_id })?;
    interval_from_row(resolver, row)
}

/// Load every shard interval of a table, ascending by shard id.
pub fn load_shard_interval_list<S: CatalogStore + ?Sized>(
    resolver: &PartitionResolver<'_, S>,
    store: &S,
    table_id: TableId,
) -> Result<Vec<ShardInterval>> {
    let intervals = store
        .shard_ids_for_table(table_id)?
        .into_iter()
        .map(|shard_id| load_shard_interval(resolver, store, shard_id))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Loaded {} shard intervals for table {}",
        intervals.len(),
        table_id
    );
    Ok(intervals)
}

fn interval_from_row<S: CatalogStore + ?Sized>(
    resolver: &PartitionResolver<'_, S>,
    row: ShardRow,
) -> Result<ShardInterval> {
    let value_type = if resolver.partition_method(row.table_id)?.is_hash() {
        ValueType::Int4
    } else {
        resolver.partition_key(row.table_id)?.value_type()
    };

    let parse = |text: Option<String>| -> Result<Option<Value>> {
        text.map(|text| {
            value_type.parse(&text).map_err(|e| {
                DirectoryError::invalid_boundary(row.shard_id, e.to_string())
            })
        })
        .transpose()
    };
    let min_value = parse(row.min_value)?;
    let max_value = parse(row.max_value)?;

    if let (Some(min), Some(max)) = (&min_value, &max_value) {
        if min > max {
            return Err(DirectoryError::invalid_boundary(
                row.shard_id,
                format!("minimum {min} is greater than maximum {max}"),
            ));
        }
    }

    Ok(ShardInterval {
        id: row.shard_id,
        table_id: row.table_id,
        storage: row.storage,
        min_value,
        max_value,
        value_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PartitionRow, SqliteCatalog};
    use crate::relation::Relation;
    use crate::types::PartitionMethod;
    use shardmeta_config::KeyEncoding;

    fn catalog(method: PartitionMethod) -> SqliteCatalog {
        let catalog = SqliteCatalog::in_memory().unwrap();
        let store = catalog.connection();
        store
            .insert_relation(&Relation::new(
                TableId(1),
                "metrics",
                [("name", ValueType::Text)],
            ))
            .unwrap();
        store
            .insert_partition_row(&PartitionRow {
                table_id: TableId(1),
                method,
                partition_key: "name".into(),
            })
            .unwrap();
        catalog
    }

    fn shard(id: u64, min: Option<&str>, max: Option<&str>) -> ShardRow {
        ShardRow {
            shard_id: ShardId(id),
            table_id: TableId(1),
            storage: ShardStorage::Table,
            min_value: min.map(String::from),
            max_value: max.map(String::from),
        }
    }

    #[test]
    fn test_value_type_follows_key_for_range_tables() {
        let catalog = catalog(PartitionMethod::Range);
        let store = catalog.connection();
        store.insert_shard_row(&shard(5, Some("a"), Some("m"))).unwrap();

        let resolver = PartitionResolver::new(store, KeyEncoding::ColumnName);
        let interval = load_shard_interval(&resolver, store, ShardId(5)).unwrap();
        assert_eq!(interval.value_type, ValueType::Text);
        assert_eq!(interval.min_value, Some(Value::Text("a".into())));
        assert!(interval.contains(&Value::Text("go".into())));
        assert!(!interval.contains(&Value::Text("z".into())));
    }

    #[test]
    fn test_hash_tables_use_int4_tokens() {
        let catalog = catalog(PartitionMethod::Hash);
        let store = catalog.connection();
        store
            .insert_shard_row(&shard(5, Some("-2147483648"), Some("-1")))
            .unwrap();

        let resolver = PartitionResolver::new(store, KeyEncoding::ColumnName);
        let interval = load_shard_interval(&resolver, store, ShardId(5)).unwrap();
        assert_eq!(interval.value_type, ValueType::Int4);
        assert_eq!(interval.max_value, Some(Value::Int4(-1)));
    }

    #[test]
    fn test_open_bounds() {
        let catalog = catalog(PartitionMethod::Append);
        let store = catalog.connection();
        store.insert_shard_row(&shard(5, None, None)).unwrap();

        let resolver = PartitionResolver::new(store, KeyEncoding::ColumnName);
        let interval = load_shard_interval(&resolver, store, ShardId(5)).unwrap();
        assert!(!interval.has_bounds());
        assert!(interval.contains(&Value::Text("anything".into())));
    }

    #[test]
    fn test_invalid_boundaries() {
        let catalog = catalog(PartitionMethod::Hash);
        let store = catalog.connection();
        store.insert_shard_row(&shard(5, Some("x"), Some("1"))).unwrap();
        store.insert_shard_row(&shard(6, Some("10"), Some("1"))).unwrap();

        let resolver = PartitionResolver::new(store, KeyEncoding::ColumnName);
        assert!(matches!(
            load_shard_interval(&resolver, store, ShardId(5)),
            Err(DirectoryError::InvalidShardBoundary { .. })
        ));
        assert!(matches!(
            load_shard_interval(&resolver, store, ShardId(6)),
            Err(DirectoryError::InvalidShardBoundary { .. })
        ));
        assert!(matches!(
            load_shard_interval(&resolver, store, ShardId(7)),
            Err(DirectoryError::ShardNotFound { .. })
        ));
    }
}
