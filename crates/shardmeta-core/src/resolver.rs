//! Partitioning Resolver
//!
//! Answers "how is this table partitioned": the partition method, the
//! partition key, and column-name resolution against the relation registry.
//!
//! The stored form of the partition key depends on [`KeyEncoding`]:
//! - `ColumnName`: the catalog stores the column's name, resolved on demand
//! - `SerializedExpression`: the catalog stores a node string

use crate::catalog::CatalogStore;
use crate::error::{DirectoryError, Result};
use crate::key::{ColumnRef, KeyExpression, SerializedExpression};
use crate::relation::{system_column_attnum, Relation};
use crate::types::{PartitionMethod, TableId};
use shardmeta_config::KeyEncoding;
use tracing::trace;

/// Resolves partitioning metadata from a catalog store.
pub struct PartitionResolver<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
    encoding: KeyEncoding,
}

impl<'a, S: CatalogStore + ?Sized> PartitionResolver<'a, S> {
    pub fn new(store: &'a S, encoding: KeyEncoding) -> Self {
        Self { store, encoding }
    }

    /// Key encoding this resolver decodes.
    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    /// Partition method of a distributed table.
    pub fn partition_method(&self, table_id: TableId) -> Result<PartitionMethod> {
        self.store
            .partition_row(table_id)?
            .map(|row| row.method)
            .ok_or(DirectoryError::NotDistributed { table_id })
    }

    /// Partition key of a distributed table.
    pub fn partition_key(&self, table_id: TableId) -> Result<KeyExpression> {
        let row = self
            .store
            .partition_row(table_id)?
            .ok_or(DirectoryError::NotDistributed { table_id })?;

        trace!(
            "Decoding partition key of table {} as {}",
            table_id,
            self.encoding
        );
        match self.encoding {
            KeyEncoding::ColumnName => self.column_reference(table_id, &row.partition_key),
            KeyEncoding::SerializedExpression => {
                SerializedExpression::from_node_string(&row.partition_key)
                    .map(KeyExpression::Serialized)
                    .map_err(|e| {
                        DirectoryError::corrupt_row(
                            "dist_partition",
                            format!("partition key of table {table_id}: {e}"),
                        )
                    })
            }
        }
    }

    /// Resolve a column name of a table to a key expression.
    pub fn column_reference(&self, table_id: TableId, column_name: &str) -> Result<KeyExpression> {
        let relation = self.relation(table_id)?;

        if system_column_attnum(column_name).is_some() {
            return Err(DirectoryError::system_column(&relation.name, column_name));
        }

        let column = relation
            .column(column_name)
            .ok_or_else(|| DirectoryError::undefined_column(&relation.name, column_name))?;

        Ok(KeyExpression::Column(ColumnRef::new(
            column.name.clone(),
            column.attnum,
            column.value_type,
        )))
    }

    /// Whether a partitioning record exists for the table.
    pub fn is_distributed_table(&self, table_id: TableId) -> Result<bool> {
        Ok(self.store.partition_row(table_id)?.is_some())
    }

    /// Whether any table is distributed.
    pub fn distributed_tables_exist(&self) -> Result<bool> {
        self.store.has_partition_rows()
    }

    /// Node string of a distributed table's partition key.
    pub fn partition_key_to_node_string(&self, table_id: TableId) -> Result<String> {
        self.partition_key(table_id)?.to_node_string()
    }

    /// Node string of a column reference. The table need not be distributed.
    pub fn column_name_to_node_string(&self, table_id: TableId, column_name: &str) -> Result<String> {
        self.column_reference(table_id, column_name)?.to_node_string()
    }

    /// Current name of the column a node string refers to.
    pub fn node_string_to_column_name(&self, table_id: TableId, node_string: &str) -> Result<String> {
        let expr = SerializedExpression::from_node_string(node_string)?;
        let column = expr.expr.column();
        let relation = self.relation(table_id)?;

        if column.attnum < 1 {
            return Err(DirectoryError::system_column(&relation.name, &column.name));
        }

        relation
            .column_by_attnum(column.attnum)
            .map(|c| c.name.clone())
            .ok_or_else(|| {
                DirectoryError::undefined_column(&relation.name, format!("attribute {}", column.attnum))
            })
    }

    fn relation(&self, table_id: TableId) -> Result<Relation> {
        self.store
            .relation(table_id)?
            .ok_or(DirectoryError::UndefinedTable { table_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PartitionRow, SqliteCatalog};
    use crate::key::ScalarExpr;
    use crate::value::ValueType;
    use pretty_assertions::assert_eq;

    fn catalog() -> SqliteCatalog {
        let catalog = SqliteCatalog::in_memory().unwrap();
        catalog
            .connection()
            .insert_relation(&Relation::new(
                TableId(1),
                "events",
                [("tenant", ValueType::Int4), ("body", ValueType::Text)],
            ))
            .unwrap();
        catalog
    }

    #[test]
    fn test_not_distributed() {
        let catalog = catalog();
        let resolver = PartitionResolver::new(catalog.connection(), KeyEncoding::default());

        assert!(matches!(
            resolver.partition_method(TableId(1)),
            Err(DirectoryError::NotDistributed { table_id }) if table_id == TableId(1)
        ));
        assert!(matches!(
            resolver.partition_key(TableId(1)),
            Err(DirectoryError::NotDistributed { .. })
        ));
        assert!(!resolver.is_distributed_table(TableId(1)).unwrap());
        assert!(!resolver.distributed_tables_exist().unwrap());
    }

    #[test]
    fn test_column_reference_errors() {
        let catalog = catalog();
        let resolver = PartitionResolver::new(catalog.connection(), KeyEncoding::ColumnName);

        let key = resolver.column_reference(TableId(1), "body").unwrap();
        assert_eq!(key.column(), &ColumnRef::new("body", 2, ValueType::Text));

        assert!(matches!(
            resolver.column_reference(TableId(1), "missing"),
            Err(DirectoryError::UndefinedColumn { .. })
        ));
        assert!(matches!(
            resolver.column_reference(TableId(1), "ctid"),
            Err(DirectoryError::SystemColumnReference { .. })
        ));
        assert!(matches!(
            resolver.column_reference(TableId(2), "body"),
            Err(DirectoryError::UndefinedTable { .. })
        ));
    }

    #[test]
    fn test_partition_key_by_name() {
        let catalog = catalog();
        catalog
            .connection()
            .insert_partition_row(&PartitionRow {
                table_id: TableId(1),
                method: PartitionMethod::Hash,
                partition_key: "tenant".into(),
            })
            .unwrap();

        let resolver = PartitionResolver::new(catalog.connection(), KeyEncoding::ColumnName);
        assert_eq!(
            resolver.partition_method(TableId(1)).unwrap(),
            PartitionMethod::Hash
        );
        let key = resolver.partition_key(TableId(1)).unwrap();
        assert_eq!(
            key,
            KeyExpression::Column(ColumnRef::new("tenant", 1, ValueType::Int4))
        );
        assert!(resolver.is_distributed_table(TableId(1)).unwrap());
        assert!(resolver.distributed_tables_exist().unwrap());
    }

    #[test]
    fn test_corrupt_serialized_key() {
        let catalog = catalog();
        catalog
            .connection()
            .insert_partition_row(&PartitionRow {
                table_id: TableId(1),
                method: PartitionMethod::Range,
                partition_key: "tenant".into(),
            })
            .unwrap();

        let resolver =
            PartitionResolver::new(catalog.connection(), KeyEncoding::SerializedExpression);
        assert!(matches!(
            resolver.partition_key(TableId(1)),
            Err(DirectoryError::CorruptRow { .. })
        ));
    }

    #[test]
    fn test_node_string_column_names() {
        let catalog = catalog();
        let resolver = PartitionResolver::new(catalog.connection(), KeyEncoding::default());

        let node = resolver.column_name_to_node_string(TableId(1), "tenant").unwrap();
        assert_eq!(
            resolver.node_string_to_column_name(TableId(1), &node).unwrap(),
            "tenant"
        );

        let system = SerializedExpression::new(ScalarExpr::Column(ColumnRef::new(
            "ctid",
            -1,
            ValueType::Text,
        )))
        .to_node_string()
        .unwrap();
        assert!(matches!(
            resolver.node_string_to_column_name(TableId(1), &system),
            Err(DirectoryError::SystemColumnReference { .. })
        ));

        let dropped = SerializedExpression::new(ScalarExpr::Column(ColumnRef::new(
            "gone",
            9,
            ValueType::Int4,
        )))
        .to_node_string()
        .unwrap();
        assert!(matches!(
            resolver.node_string_to_column_name(TableId(1), &dropped),
            Err(DirectoryError::UndefinedColumn { .. })
        ));
    }
}
