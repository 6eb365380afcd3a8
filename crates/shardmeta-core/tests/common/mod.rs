//! Common test utilities for integration tests.
//!
//! Builds directories over in-memory or temporary on-disk catalogs and
//! registers a small set of fixture relations.

#![allow(dead_code)]

use std::path::PathBuf;

use shardmeta_config::{KeyEncoding, ShardMetaConfig};
use shardmeta_core::{
    DirectoryTransaction, KeyExpression, PartitionMethod, Relation, ShardDirectory, SqliteCatalog,
    TableId, ValueType,
};
use tempfile::TempDir;

/// `events(tenant_id int8, kind text, payload text)`
pub const EVENTS: TableId = TableId(16_400);

/// `users(user_id int4, email text)`
pub const USERS: TableId = TableId(16_410);

/// `metrics(name text, reading float8)`
pub const METRICS: TableId = TableId(16_420);

pub fn config(encoding: KeyEncoding) -> ShardMetaConfig {
    let mut config = ShardMetaConfig::default();
    config.partitioning.key_encoding = encoding;
    config
}

/// Directory and in-memory catalog with the fixture relations registered.
pub fn memory_directory(encoding: KeyEncoding) -> (ShardDirectory, SqliteCatalog) {
    let directory = ShardDirectory::new(config(encoding));
    let mut catalog = directory
        .open_in_memory_catalog()
        .expect("Failed to open catalog");
    register_fixtures(&directory, &mut catalog);
    (directory, catalog)
}

/// Directory over an on-disk catalog in a temporary workspace.
pub fn disk_directory(encoding: KeyEncoding) -> (TempDir, ShardDirectory, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let directory = ShardDirectory::new(config(encoding));
    let path = directory.config().catalog_path(temp_dir.path());

    let mut catalog = directory
        .open_catalog(&path)
        .expect("Failed to open catalog");
    register_fixtures(&directory, &mut catalog);

    (temp_dir, directory, path)
}

pub fn register_fixtures(directory: &ShardDirectory, catalog: &mut SqliteCatalog) {
    let txn = directory.begin(catalog).expect("Failed to begin");
    for relation in fixture_relations() {
        txn.register_relation(&relation)
            .expect("Failed to register relation");
    }
    txn.commit().expect("Failed to commit fixtures");
}

pub fn fixture_relations() -> Vec<Relation> {
    vec![
        Relation::new(
            EVENTS,
            "events",
            [
                ("tenant_id", ValueType::Int8),
                ("kind", ValueType::Text),
                ("payload", ValueType::Text),
            ],
        ),
        Relation::new(
            USERS,
            "users",
            [("user_id", ValueType::Int4), ("email", ValueType::Text)],
        ),
        Relation::new(
            METRICS,
            "metrics",
            [("name", ValueType::Text), ("reading", ValueType::Float8)],
        ),
    ]
}

/// Distribute `table_id` by `column` with `method`.
pub fn distribute(
    txn: &DirectoryTransaction<'_, '_>,
    table_id: TableId,
    column: &str,
    method: PartitionMethod,
) -> KeyExpression {
    let key = txn
        .column_reference(table_id, column)
        .expect("Failed to resolve column");
    txn.insert_partition_row(table_id, method, &key)
        .expect("Failed to insert partition row");
    key
}
