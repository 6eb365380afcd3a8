//! Advisory Shard Lock Manager
//!
//! Transaction-scoped share/exclusive locks keyed by the full 64-bit shard id.
//! A request that conflicts with another transaction's lock parks on a
//! condition variable until a holder releases; there is no timeout and no
//! deadlock detection. Locks are released all at once when the owning
//! transaction ends.
//!
//! Conflict rules:
//! - `Share` conflicts with `Exclusive` held by another transaction
//! - `Exclusive` conflicts with any lock held by another transaction
//!
//! A transaction never conflicts with itself, so re-acquisition and upgrade by
//! the sole holder are granted immediately.

use crate::error::{DirectoryError, Result};
use crate::types::{LockMode, ShardId, TxnId};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

#[derive(Default)]
struct LockTable {
    /// Strongest mode each transaction holds on each shard
    shards: HashMap<ShardId, HashMap<TxnId, LockMode>>,
    /// Shards locked by each transaction
    held: HashMap<TxnId, HashSet<ShardId>>,
}

impl LockTable {
    fn conflicts(&self, txn: TxnId, shard_id: ShardId, mode: LockMode) -> bool {
        let Some(holders) = self.shards.get(&shard_id) else {
            return false;
        };

        holders
            .iter()
            .filter(|(holder, _)| **holder != txn)
            .any(|(_, held)| mode == LockMode::Exclusive || *held == LockMode::Exclusive)
    }

    fn grant(&mut self, txn: TxnId, shard_id: ShardId, mode: LockMode) {
        let held = self
            .shards
            .entry(shard_id)
            .or_default()
            .entry(txn)
            .or_insert(mode);
        if mode == LockMode::Exclusive {
            *held = LockMode::Exclusive;
        }
        self.held.entry(txn).or_default().insert(shard_id);
    }

    fn release(&mut self, txn: TxnId) -> usize {
        let Some(shards) = self.held.remove(&txn) else {
            return 0;
        };

        for shard_id in &shards {
            if let Some(holders) = self.shards.get_mut(shard_id) {
                holders.remove(&txn);
                if holders.is_empty() {
                    self.shards.remove(shard_id);
                }
            }
        }
        shards.len()
    }
}

/// Lock manager shared by every transaction of a directory.
#[derive(Default)]
pub struct ShardLockManager {
    table: Mutex<LockTable>,
    released: Condvar,
}

impl ShardLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a lock on `shard_id` for `txn`, blocking until it is granted.
    ///
    /// Only [`LockMode::Share`] and [`LockMode::Exclusive`] are accepted; any
    /// other mode fails with [`DirectoryError::InvalidLockMode`] and acquires
    /// nothing.
    pub fn lock_shard(&self, txn: TxnId, shard_id: ShardId, mode: LockMode) -> Result<()> {
        if !mode.is_shard_lock_mode() {
            return Err(DirectoryError::InvalidLockMode {
                mode: mode.name().to_string(),
            });
        }

        let mut table = self.table.lock();
        if table.conflicts(txn, shard_id, mode) {
            debug!(
                "Transaction {} waiting for {} on shard {}",
                txn, mode, shard_id
            );
            while table.conflicts(txn, shard_id, mode) {
                self.released.wait(&mut table);
            }
        }

        table.grant(txn, shard_id, mode);
        trace!("Transaction {} acquired {} on shard {}", txn, mode, shard_id);
        Ok(())
    }

    /// Release every lock held by `txn`; returns the number of shards released.
    pub fn release_all(&self, txn: TxnId) -> usize {
        let released = self.table.lock().release(txn);
        if released > 0 {
            self.released.notify_all();
            trace!("Transaction {} released {} shard locks", txn, released);
        }
        released
    }

    /// Strongest mode `txn` holds on `shard_id`.
    pub fn held_mode(&self, txn: TxnId, shard_id: ShardId) -> Option<LockMode> {
        self.table
            .lock()
            .shards
            .get(&shard_id)
            .and_then(|holders| holders.get(&txn).copied())
    }

    /// Number of shards `txn` holds locks on.
    pub fn held_count(&self, txn: TxnId) -> usize {
        self.table.lock().held.get(&txn).map_or(0, HashSet::len)
    }

    /// Whether any transaction holds a lock on `shard_id`.
    pub fn is_locked(&self, shard_id: ShardId) -> bool {
        self.table.lock().shards.contains_key(&shard_id)
    }
}

/// Releases a transaction's shard locks when dropped.
pub struct TransactionLocks<'m> {
    manager: &'m ShardLockManager,
    txn: TxnId,
}

impl<'m> TransactionLocks<'m> {
    pub fn new(manager: &'m ShardLockManager, txn: TxnId) -> Self {
        Self { manager, txn }
    }

    pub fn txn(&self) -> TxnId {
        self.txn
    }

    pub fn lock_shard(&self, shard_id: ShardId, mode: LockMode) -> Result<()> {
        self.manager.lock_shard(self.txn, shard_id, mode)
    }

    pub fn held_mode(&self, shard_id: ShardId) -> Option<LockMode> {
        self.manager.held_mode(self.txn, shard_id)
    }
}

impl Drop for TransactionLocks<'_> {
    fn drop(&mut self) {
        self.manager.release_all(self.txn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    const SHARD: ShardId = ShardId(u64::MAX - 1);

    #[test]
    fn test_invalid_mode_acquires_nothing() {
        let locks = ShardLockManager::new();
        let err = locks
            .lock_shard(TxnId(1), SHARD, LockMode::RowExclusive)
            .unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidLockMode { ref mode } if mode == "RowExclusiveLock"));
        assert!(!locks.is_locked(SHARD));
        assert_eq!(locks.held_count(TxnId(1)), 0);
    }

    #[test]
    fn test_shared_locks_coexist() {
        let locks = ShardLockManager::new();
        locks.lock_shard(TxnId(1), SHARD, LockMode::Share).unwrap();
        locks.lock_shard(TxnId(2), SHARD, LockMode::Share).unwrap();
        assert_eq!(locks.held_mode(TxnId(2), SHARD), Some(LockMode::Share));
    }

    #[test]
    fn test_reentrant_and_upgrade() {
        let locks = ShardLockManager::new();
        locks.lock_shard(TxnId(1), SHARD, LockMode::Share).unwrap();
        locks.lock_shard(TxnId(1), SHARD, LockMode::Share).unwrap();
        locks.lock_shard(TxnId(1), SHARD, LockMode::Exclusive).unwrap();
        locks.lock_shard(TxnId(1), SHARD, LockMode::Share).unwrap();

        assert_eq!(locks.held_mode(TxnId(1), SHARD), Some(LockMode::Exclusive));
        assert_eq!(locks.held_count(TxnId(1)), 1);
        assert_eq!(locks.release_all(TxnId(1)), 1);
        assert!(!locks.is_locked(SHARD));
    }

    #[test]
    fn test_exclusive_blocks_until_release() {
        let locks = ShardLockManager::new();
        let acquired = AtomicBool::new(false);
        locks.lock_shard(TxnId(1), SHARD, LockMode::Exclusive).unwrap();

        std::thread::scope(|s| {
            s.spawn(|| {
                locks.lock_shard(TxnId(2), SHARD, LockMode::Share).unwrap();
                acquired.store(true, Ordering::SeqCst);
            });

            std::thread::sleep(Duration::from_millis(100));
            assert!(!acquired.load(Ordering::SeqCst));

            locks.release_all(TxnId(1));
        });

        assert!(acquired.load(Ordering::SeqCst));
        assert_eq!(locks.held_mode(TxnId(2), SHARD), Some(LockMode::Share));
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let locks = ShardLockManager::new();
        {
            let guard = TransactionLocks::new(&locks, TxnId(7));
            guard.lock_shard(SHARD, LockMode::Exclusive).unwrap();
            guard.lock_shard(ShardId(1), LockMode::Share).unwrap();
            assert_eq!(locks.held_count(TxnId(7)), 2);
        }
        assert_eq!(locks.held_count(TxnId(7)), 0);
        assert!(!locks.is_locked(SHARD));
    }
}
