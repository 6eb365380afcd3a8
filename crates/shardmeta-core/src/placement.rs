//! Shard placement loading.

use crate::catalog::CatalogStore;
use crate::error::{DirectoryError, Result};
use crate::types::{PlacementId, ShardId, ShardState};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Location of one physical copy of a shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardPlacement {
    pub id: PlacementId,
    pub shard_id: ShardId,
    pub state: ShardState,
    pub node_name: String,
    pub node_port: u32,
}

impl ShardPlacement {
    /// `name:port` address of the placement's node.
    pub fn node_address(&self) -> String {
        format!("{}:{}", self.node_name, self.node_port)
    }

    /// Whether the placement can serve reads and writes.
    pub fn is_finalized(&self) -> bool {
        self.state == ShardState::Finalized
    }
}

/// Load every placement of a shard, ascending by placement id.
///
/// Fails with [`DirectoryError::ShardNotPlaced`] when the shard has none.
pub fn load_placements<S: CatalogStore + ?Sized>(
    store: &S,
    shard_id: ShardId,
) -> Result<Vec<ShardPlacement>> {
    let placements = store.placements_for_shard(shard_id)?;
    if placements.is_empty() {
        return Err(DirectoryError::ShardNotPlaced { shard_id });
    }
    debug!("Loaded {} placements for shard {}", placements.len(), shard_id);
    Ok(placements)
}

/// Load the finalized placements of a shard.
///
/// An empty result is not an error, but a shard with no placements at all
/// still fails with [`DirectoryError::ShardNotPlaced`].
pub fn load_finalized_placements<S: CatalogStore + ?Sized>(
    store: &S,
    shard_id: ShardId,
) -> Result<Vec<ShardPlacement>> {
    let placements = load_placements(store, shard_id)?;
    Ok(placements
        .into_iter()
        .filter(ShardPlacement::is_finalized)
        .collect())
}
