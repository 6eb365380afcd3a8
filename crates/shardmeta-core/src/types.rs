//! Identifiers and catalog enumerations.
//!
//! Enumerations carry the single-character or integer codes used in the
//! catalog tables so rows stay readable with plain SQL tooling.

use crate::error::DirectoryError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a logical table (host relation id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(pub u32);

/// Globally unique shard identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardId(pub u64);

/// Unique shard placement identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlacementId(pub u64);

/// Identifier of an open directory transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxnId(pub u64);

macro_rules! impl_id {
    ($name:ident, $inner:ty) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }
    };
}

impl_id!(TableId, u32);
impl_id!(ShardId, u64);
impl_id!(PlacementId, u64);
impl_id!(TxnId, u64);

/// Scheme used to assign rows to shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionMethod {
    /// Rows are assigned by a 32-bit hash of the partition key
    Hash,
    /// Rows are assigned by partition key value ranges
    Range,
    /// Shards are appended with value ranges observed at load time
    Append,
}

impl PartitionMethod {
    /// Catalog code for this method.
    pub fn code(self) -> char {
        match self {
            Self::Hash => 'h',
            Self::Range => 'r',
            Self::Append => 'a',
        }
    }

    /// Decode a catalog code.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'h' => Some(Self::Hash),
            'r' => Some(Self::Range),
            'a' => Some(Self::Append),
            _ => None,
        }
    }

    /// Whether shard boundaries are hash tokens rather than key values.
    pub fn is_hash(self) -> bool {
        matches!(self, Self::Hash)
    }
}

/// Physical storage kind of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardStorage {
    /// Regular table
    Table,
    /// Foreign table
    Foreign,
    /// Columnar store table
    Columnar,
}

impl ShardStorage {
    /// Catalog code for this storage kind.
    pub fn code(self) -> char {
        match self {
            Self::Table => 't',
            Self::Foreign => 'f',
            Self::Columnar => 'c',
        }
    }

    /// Decode a catalog code.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            't' => Some(Self::Table),
            'f' => Some(Self::Foreign),
            'c' => Some(Self::Columnar),
            _ => None,
        }
    }
}

/// State of a shard placement.
///
/// Only `Finalized` placements are servable; the remaining states are
/// reserved for placement lifecycle management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShardState {
    Finalized,
    Cached,
    ToDelete,
    Inactive,
}

impl ShardState {
    /// Catalog code for this state.
    pub fn code(self) -> i32 {
        match self {
            Self::Finalized => 1,
            Self::Cached => 2,
            Self::ToDelete => 3,
            Self::Inactive => 4,
        }
    }

    /// Decode a catalog code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Finalized),
            2 => Some(Self::Cached),
            3 => Some(Self::ToDelete),
            4 => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// Host lock modes.
///
/// The full vocabulary exists so callers can pass whatever mode their host
/// layer uses; shard locks accept only [`LockMode::Share`] and
/// [`LockMode::Exclusive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    AccessShare,
    RowShare,
    RowExclusive,
    ShareUpdateExclusive,
    Share,
    ShareRowExclusive,
    Exclusive,
    AccessExclusive,
}

impl LockMode {
    const ALL: [LockMode; 8] = [
        Self::AccessShare,
        Self::RowShare,
        Self::RowExclusive,
        Self::ShareUpdateExclusive,
        Self::Share,
        Self::ShareRowExclusive,
        Self::Exclusive,
        Self::AccessExclusive,
    ];

    /// Host name of the mode, e.g. `ShareLock`.
    pub fn name(self) -> &'static str {
        match self {
            Self::AccessShare => "AccessShareLock",
            Self::RowShare => "RowShareLock",
            Self::RowExclusive => "RowExclusiveLock",
            Self::ShareUpdateExclusive => "ShareUpdateExclusiveLock",
            Self::Share => "ShareLock",
            Self::ShareRowExclusive => "ShareRowExclusiveLock",
            Self::Exclusive => "ExclusiveLock",
            Self::AccessExclusive => "AccessExclusiveLock",
        }
    }

    /// Whether shard locks can be taken in this mode.
    pub fn is_shard_lock_mode(self) -> bool {
        matches!(self, Self::Share | Self::Exclusive)
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for LockMode {
    type Err = DirectoryError;

    /// Accepts host names (`ShareLock`) and bare names (`share`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['_', ' '], "");
        let wanted = wanted.strip_suffix("lock").unwrap_or(&wanted);

        Self::ALL
            .into_iter()
            .find(|mode| {
                let name = mode.name().to_lowercase();
                name.strip_suffix("lock") == Some(wanted)
            })
            .ok_or_else(|| DirectoryError::InvalidLockMode {
                mode: s.to_string(),
            })
    }
}
