//! SQLite Catalog Connection
//!
//! Wraps the rusqlite connections behind one catalog: the catalog database
//! itself and its companion sequence database. Opening creates both schemas,
//! checks the catalog version and bootstraps the identifier sequences.

use super::schema::{self, CATALOG_SCHEMA_VERSION};
use super::SequenceStore;
use crate::error::{DirectoryError, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use shardmeta_config::{CatalogConfig, SequenceConfig};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Suffix appended to the catalog file name to locate its sequence database.
const SEQUENCE_STORE_SUFFIX: &str = "-sequences";

/// Path of the sequence database that accompanies a catalog file.
pub fn sequence_store_path(catalog_path: &Path) -> PathBuf {
    let mut name = OsString::from(catalog_path.as_os_str());
    name.push(SEQUENCE_STORE_SUFFIX);
    PathBuf::from(name)
}

/// A connection to a catalog database.
///
/// Each thread that runs directory transactions owns its own `SqliteCatalog`;
/// the directory handle itself is shared. Sequence values are drawn on a
/// second connection in autocommit mode, so allocating an identifier never
/// waits on, or rolls back with, catalog writes.
pub struct SqliteCatalog {
    conn: Connection,
    sequences: Connection,
}

impl SqliteCatalog {
    /// Open a catalog database, creating the schema when the file is new.
    pub fn open(path: &Path, config: &CatalogConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure_connection(&conn, config)?;

        let sequences = Connection::open(sequence_store_path(path))?;
        Self::configure_connection(&sequences, config)?;

        let catalog = Self { conn, sequences };
        catalog.ensure_schema()?;
        info!("Opened shard catalog {:?}", path);
        Ok(catalog)
    }

    /// Create an in-memory catalog (for testing)
    pub fn in_memory() -> Result<Self> {
        let catalog = Self {
            conn: Connection::open_in_memory()?,
            sequences: Connection::open_in_memory()?,
        };
        catalog.ensure_schema()?;
        Ok(catalog)
    }

    fn configure_connection(conn: &Connection, config: &CatalogConfig) -> Result<()> {
        conn.pragma_update(None, "journal_mode", config.journal_mode.pragma_value())?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        Ok(())
    }

    fn ensure_schema(&self) -> Result<()> {
        schema::create_sequence_store(&self.sequences)?;

        let has_metadata: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master \
             WHERE type = 'table' AND name = 'dist_catalog_metadata')",
            [],
            |row| row.get(0),
        )?;

        if has_metadata {
            match self.get_metadata("schema_version")? {
                Some(version) if version == CATALOG_SCHEMA_VERSION => return Ok(()),
                Some(found) => {
                    return Err(DirectoryError::SchemaVersionMismatch {
                        expected: CATALOG_SCHEMA_VERSION.to_string(),
                        found,
                    })
                }
                None => {}
            }
        }

        info!("Creating shard catalog schema v{}", CATALOG_SCHEMA_VERSION);
        let tx = self.conn.unchecked_transaction()?;
        schema::create_all(&tx)?;
        tx.execute(
            "INSERT OR REPLACE INTO dist_catalog_metadata (key, value) VALUES ('schema_version', ?1)",
            [CATALOG_SCHEMA_VERSION],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Get a catalog metadata value
    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM dist_catalog_metadata WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Set a catalog metadata value
    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO dist_catalog_metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Create the shard and placement identifier sequences if missing.
    pub fn bootstrap_sequences(&self, config: &SequenceConfig) -> Result<()> {
        for (name, start) in [
            (config.shard_id.as_str(), config.shard_id_start),
            (config.placement_id.as_str(), config.placement_id_start),
        ] {
            if self.sequences.create_sequence(name, start)? {
                debug!("Created sequence {} starting at {}", name, start);
            }
        }
        Ok(())
    }

    /// Read-only access to the catalog connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// The autocommit sequence connection.
    pub fn sequences(&self) -> &Connection {
        &self.sequences
    }

    /// Start a catalog transaction alongside the sequence connection.
    pub(crate) fn transaction(&mut self) -> Result<(Transaction<'_>, &Connection)> {
        let tx = self.conn.transaction()?;
        Ok((tx, &self.sequences))
    }
}
