//! Partition key encoding tests.
//!
//! Both encodings must resolve a table's partition key to the same column and
//! value type; only the serialized encoding can store wrapped expressions.

mod common;

use common::{distribute, memory_directory, EVENTS, METRICS, USERS};
use pretty_assertions::assert_eq;
use shardmeta_config::KeyEncoding;
use shardmeta_core::{
    DirectoryError, KeyExpression, PartitionMethod, ScalarExpr, SerializedExpression, ShardId,
    ShardStorage, Value, ValueType,
};

const ENCODINGS: [KeyEncoding; 2] = [KeyEncoding::ColumnName, KeyEncoding::SerializedExpression];

#[test]
fn test_encodings_resolve_equivalent_keys() {
    let mut resolved = Vec::new();

    for encoding in ENCODINGS {
        let (directory, mut catalog) = memory_directory(encoding);
        let txn = directory.begin(&mut catalog).unwrap();
        distribute(&txn, METRICS, "reading", PartitionMethod::Range);

        let key = txn.resolve_partition_key(METRICS).unwrap();
        match encoding {
            KeyEncoding::ColumnName => assert!(matches!(key, KeyExpression::Column(_))),
            KeyEncoding::SerializedExpression => {
                assert!(matches!(key, KeyExpression::Serialized(_)))
            }
        }
        resolved.push((key.column().clone(), key.value_type()));
    }

    assert_eq!(resolved[0], resolved[1]);
    assert_eq!(resolved[0].1, ValueType::Float8);
}

#[test]
fn test_encodings_produce_same_intervals() {
    let mut bounds = Vec::new();

    for encoding in ENCODINGS {
        let (directory, mut catalog) = memory_directory(encoding);
        let txn = directory.begin(&mut catalog).unwrap();
        distribute(&txn, METRICS, "reading", PartitionMethod::Range);
        txn.insert_shard_row(
            METRICS,
            ShardId(1),
            ShardStorage::Table,
            Some("-Infinity"),
            Some("0.5"),
        )
        .unwrap();

        let interval = txn.load_shard_interval(ShardId(1)).unwrap();
        bounds.push((interval.min_value, interval.max_value));
    }

    assert_eq!(bounds[0], bounds[1]);
    assert_eq!(
        bounds[0],
        (
            Some(Value::Float8(f64::NEG_INFINITY)),
            Some(Value::Float8(0.5))
        )
    );
}

#[test]
fn test_serialized_encoding_stores_expressions() {
    let (directory, mut catalog) = memory_directory(KeyEncoding::SerializedExpression);
    let txn = directory.begin(&mut catalog).unwrap();

    let column = txn.column_reference(USERS, "user_id").unwrap();
    let key = KeyExpression::Serialized(SerializedExpression::new(ScalarExpr::cast(
        column.to_scalar_expr(),
        ValueType::Int8,
    )));
    txn.insert_partition_row(USERS, PartitionMethod::Range, &key)
        .unwrap();

    let resolved = txn.resolve_partition_key(USERS).unwrap();
    assert_eq!(resolved, key);
    assert_eq!(resolved.value_type(), ValueType::Int8);
    assert_eq!(resolved.column().name, "user_id");

    txn.insert_shard_row(USERS, ShardId(1), ShardStorage::Table, Some("0"), Some("5000000000"))
        .unwrap();
    let interval = txn.load_shard_interval(ShardId(1)).unwrap();
    assert_eq!(interval.max_value, Some(Value::Int8(5_000_000_000)));

    let row = [Some(Value::Int4(12)), None];
    assert_eq!(resolved.evaluate(&row).unwrap(), Some(Value::Int8(12)));
}

#[test]
fn test_column_name_encoding_rejects_expressions() {
    let (directory, mut catalog) = memory_directory(KeyEncoding::ColumnName);
    let txn = directory.begin(&mut catalog).unwrap();

    let column = txn.column_reference(EVENTS, "kind").unwrap();
    let key = KeyExpression::Serialized(SerializedExpression::new(ScalarExpr::cast(
        column.to_scalar_expr(),
        ValueType::Int4,
    )));

    assert!(matches!(
        txn.insert_partition_row(EVENTS, PartitionMethod::Hash, &key),
        Err(DirectoryError::UnsupportedKeyExpression(_))
    ));
    assert!(!txn.is_distributed_table(EVENTS).unwrap());
}

#[test]
fn test_column_name_encoding_follows_relation_changes() {
    let (directory, mut catalog) = memory_directory(KeyEncoding::ColumnName);
    let txn = directory.begin(&mut catalog).unwrap();
    distribute(&txn, USERS, "user_id", PartitionMethod::Range);

    let mut users = txn.lookup_relation(USERS).unwrap();
    users.columns[0].value_type = ValueType::Int8;
    txn.register_relation(&users).unwrap();

    let key = txn.resolve_partition_key(USERS).unwrap();
    assert_eq!(key.value_type(), ValueType::Int8);
}
