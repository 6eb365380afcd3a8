//! SQLite Schema Definitions for the Shard Catalog
//!
//! The catalog database holds the partitioning records, shard rows,
//! placements and the relation registry. Identifier sequences live in a
//! companion sequence database next to it.

/// Schema version for catalog databases
pub const CATALOG_SCHEMA_VERSION: &str = "1.0";

/// SQL to create the partition table
///
/// One row per distributed table. `partition_key` holds either a column name
/// or a serialized expression, depending on the configured key encoding.
pub const SCHEMA_CREATE_PARTITION: &str = r#"
CREATE TABLE IF NOT EXISTS dist_partition (
    table_id INTEGER PRIMARY KEY NOT NULL,

    -- 'h' hash, 'r' range, 'a' append
    partition_method TEXT NOT NULL,

    partition_key TEXT NOT NULL
)
"#;

/// SQL to create the shard table
///
/// Boundaries are stored as text in the partition key's canonical form and are
/// either both present or both NULL.
pub const SCHEMA_CREATE_SHARD: &str = r#"
CREATE TABLE IF NOT EXISTS dist_shard (
    shard_id INTEGER PRIMARY KEY NOT NULL,
    table_id INTEGER NOT NULL,

    -- 't' table, 'f' foreign, 'c' columnar
    storage_kind TEXT NOT NULL,

    min_value TEXT,
    max_value TEXT,

    CHECK ((min_value IS NULL) = (max_value IS NULL))
)
"#;

/// SQL to create the placement table
pub const SCHEMA_CREATE_PLACEMENT: &str = r#"
CREATE TABLE IF NOT EXISTS dist_shard_placement (
    placement_id INTEGER PRIMARY KEY NOT NULL,
    shard_id INTEGER NOT NULL,

    -- 1 finalized, 2 cached, 3 to delete, 4 inactive
    state INTEGER NOT NULL,

    node_name TEXT NOT NULL,
    node_port INTEGER NOT NULL
)
"#;

/// SQL to create the sequence table (sequence database)
///
/// `last_value` is NULL until the first value is issued.
pub const SCHEMA_CREATE_SEQUENCE: &str = r#"
CREATE TABLE IF NOT EXISTS dist_sequence (
    name TEXT PRIMARY KEY NOT NULL,
    start_value INTEGER NOT NULL CHECK (start_value >= 0),
    increment INTEGER NOT NULL DEFAULT 1 CHECK (increment > 0),
    last_value INTEGER
)
"#;

/// SQL to create the relation registry tables
pub const SCHEMA_CREATE_RELATION: &str = r#"
CREATE TABLE IF NOT EXISTS dist_relation (
    table_id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dist_relation_column (
    table_id INTEGER NOT NULL,
    attnum INTEGER NOT NULL,
    name TEXT NOT NULL,
    value_type TEXT NOT NULL,

    PRIMARY KEY (table_id, attnum),
    UNIQUE (table_id, name)
);
"#;

/// SQL to create secondary indexes
pub const SCHEMA_CREATE_INDEXES: &str = r#"
-- Shards of a table
CREATE INDEX IF NOT EXISTS idx_dist_shard_table ON dist_shard(table_id, shard_id);

-- Placements of a shard
CREATE INDEX IF NOT EXISTS idx_dist_placement_shard ON dist_shard_placement(shard_id, placement_id);
"#;

/// SQL to create the metadata table
pub const SCHEMA_CREATE_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS dist_catalog_metadata (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)
"#;

/// Column names for shard queries (in order for row mapping)
pub const SHARD_COLUMNS: &str = "shard_id, table_id, storage_kind, min_value, max_value";

/// Column names for placement queries (in order for row mapping)
pub const PLACEMENT_COLUMNS: &str = "placement_id, shard_id, state, node_name, node_port";

/// Create every catalog table and index.
pub fn create_all(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(SCHEMA_CREATE_PARTITION, [])?;
    conn.execute(SCHEMA_CREATE_SHARD, [])?;
    conn.execute(SCHEMA_CREATE_PLACEMENT, [])?;
    conn.execute_batch(SCHEMA_CREATE_RELATION)?;
    conn.execute(SCHEMA_CREATE_METADATA, [])?;
    conn.execute_batch(SCHEMA_CREATE_INDEXES)?;
    Ok(())
}

/// Create the sequence database's table.
pub fn create_sequence_store(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(SCHEMA_CREATE_SEQUENCE, [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_all(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for expected in [
            "dist_catalog_metadata",
            "dist_partition",
            "dist_relation",
            "dist_relation_column",
            "dist_shard",
            "dist_shard_placement",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
        assert!(!tables.contains(&"dist_sequence".to_string()));
    }

    #[test]
    fn test_sequence_store_rejects_bad_rows() {
        let conn = Connection::open_in_memory().unwrap();
        create_sequence_store(&conn).unwrap();
        create_sequence_store(&conn).unwrap();

        assert!(conn
            .execute(
                "INSERT INTO dist_sequence (name, start_value, increment) VALUES ('a', 1, 0)",
                [],
            )
            .is_err());
        assert!(conn
            .execute(
                "INSERT INTO dist_sequence (name, start_value) VALUES ('b', -5)",
                [],
            )
            .is_err());
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_all(&conn).unwrap();
        create_all(&conn).unwrap();
    }

    #[test]
    fn test_shard_bounds_stored_as_pair() {
        let conn = Connection::open_in_memory().unwrap();
        create_all(&conn).unwrap();

        let half_open = conn.execute(
            "INSERT INTO dist_shard (shard_id, table_id, storage_kind, min_value, max_value) \
             VALUES (1, 1, 't', '5', NULL)",
            [],
        );
        assert!(half_open.is_err());

        conn.execute(
            "INSERT INTO dist_shard (shard_id, table_id, storage_kind, min_value, max_value) \
             VALUES (2, 1, 't', NULL, NULL)",
            [],
        )
        .unwrap();
    }
}
