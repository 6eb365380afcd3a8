//! Workspace configuration tests.
//!
//! Loads directories through `ShardDirectory::load`, which reads the
//! workspace's `.shardmeta/config.toml` layer.

mod common;

use std::path::Path;

use common::{distribute, register_fixtures, EVENTS};
use pretty_assertions::assert_eq;
use shardmeta_config::{ConfigOverrides, KeyEncoding};
use shardmeta_core::{CatalogStore, KeyExpression, PartitionMethod, ShardDirectory};
use tempfile::TempDir;

fn write_workspace_config(root: &Path, content: &str) {
    let dir = root.join(".shardmeta");
    std::fs::create_dir_all(&dir).expect("Failed to create config dir");
    std::fs::write(dir.join("config.toml"), content).expect("Failed to write config");
}

const COLUMN_NAME_WORKSPACE: &str = r#"
[catalog]
path = "meta/catalog.db"

[partitioning]
key_encoding = "column-name"
"#;

#[test]
fn test_workspace_config_stores_keys_by_column_name() {
    let temp = TempDir::new().unwrap();
    write_workspace_config(temp.path(), COLUMN_NAME_WORKSPACE);

    let directory = ShardDirectory::load(temp.path(), None).unwrap();
    assert_eq!(
        directory.config().partitioning.key_encoding,
        KeyEncoding::ColumnName
    );

    let mut catalog = directory.open_workspace_catalog(temp.path()).unwrap();
    assert!(temp.path().join("meta/catalog.db").exists());
    register_fixtures(&directory, &mut catalog);

    let txn = directory.begin(&mut catalog).unwrap();
    distribute(&txn, EVENTS, "tenant_id", PartitionMethod::Hash);
    assert!(matches!(
        txn.resolve_partition_key(EVENTS).unwrap(),
        KeyExpression::Column(_)
    ));
    txn.commit().unwrap();

    let stored = catalog
        .connection()
        .partition_row(EVENTS)
        .unwrap()
        .expect("partition row committed");
    assert_eq!(stored.partition_key, "tenant_id");
}

#[test]
fn test_overrides_replace_workspace_encoding() {
    let temp = TempDir::new().unwrap();
    write_workspace_config(temp.path(), COLUMN_NAME_WORKSPACE);

    let overrides = ConfigOverrides {
        key_encoding: Some(KeyEncoding::SerializedExpression),
        ..Default::default()
    };
    let directory = ShardDirectory::load(temp.path(), Some(&overrides)).unwrap();

    let mut catalog = directory.open_workspace_catalog(temp.path()).unwrap();
    register_fixtures(&directory, &mut catalog);
    let txn = directory.begin(&mut catalog).unwrap();
    distribute(&txn, EVENTS, "tenant_id", PartitionMethod::Hash);
    assert!(matches!(
        txn.resolve_partition_key(EVENTS).unwrap(),
        KeyExpression::Serialized(_)
    ));
    txn.commit().unwrap();

    let stored = catalog
        .connection()
        .partition_row(EVENTS)
        .unwrap()
        .expect("partition row committed");
    assert_ne!(stored.partition_key, "tenant_id");
}

#[test]
fn test_invalid_workspace_config_is_rejected() {
    let temp = TempDir::new().unwrap();
    write_workspace_config(
        temp.path(),
        r#"
        [catalog]
        busy_timeout_ms = 0
        "#,
    );

    let err = ShardDirectory::load(temp.path(), None).err().unwrap();
    assert!(err.to_string().contains("catalog.busy_timeout_ms"));
}
