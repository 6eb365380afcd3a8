//! Shard Interval Cache
//!
//! Memoizes each table's shard interval list at its first non-empty load.
//! Entries are never refreshed or invalidated, and empty lists are never
//! cached, so a table with no shards is reloaded on every lookup until its
//! first shard appears. Callers that need a fresh view load the list directly.
//!
//! Thread-safe: entries live in a DashMap and metrics behind a
//! parking_lot::Mutex, so one cache serves every transaction of a directory.

use crate::error::Result;
use crate::interval::ShardInterval;
use crate::types::TableId;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Cache metrics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that loaded from the catalog
    pub misses: u64,
    /// Misses whose load returned no shards (not cached)
    pub empty_loads: u64,
}

impl CacheMetrics {
    /// Get hit rate as a fraction (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Per-table cache of shard interval lists.
#[derive(Default)]
pub struct ShardIntervalCache {
    entries: DashMap<TableId, Arc<[ShardInterval]>>,
    metrics: Mutex<CacheMetrics>,
}

impl ShardIntervalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached list for `table_id`, or load it with `load`.
    ///
    /// Non-empty loads are stored; if another caller stored a list for the
    /// same table first, that earlier list wins and is returned.
    pub fn get_or_load<F>(&self, table_id: TableId, load: F) -> Result<Arc<[ShardInterval]>>
    where
        F: FnOnce() -> Result<Vec<ShardInterval>>,
    {
        if let Some(entry) = self.entries.get(&table_id) {
            self.metrics.lock().hits += 1;
            debug!("Shard interval cache hit for table {}", table_id);
            return Ok(Arc::clone(entry.value()));
        }

        self.metrics.lock().misses += 1;
        let loaded: Arc<[ShardInterval]> = load()?.into();

        if loaded.is_empty() {
            self.metrics.lock().empty_loads += 1;
            debug!("Table {} has no shards; not caching", table_id);
            return Ok(loaded);
        }

        debug!(
            "Caching {} shard intervals for table {}",
            loaded.len(),
            table_id
        );
        let entry = self.entries.entry(table_id).or_insert(loaded);
        Ok(Arc::clone(entry.value()))
    }

    /// Cached list for a table, without loading.
    pub fn get(&self, table_id: TableId) -> Option<Arc<[ShardInterval]>> {
        self.entries.get(&table_id).map(|e| Arc::clone(e.value()))
    }

    pub fn contains(&self, table_id: TableId) -> bool {
        self.entries.contains_key(&table_id)
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the cache metrics.
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.lock().clone()
    }
}
