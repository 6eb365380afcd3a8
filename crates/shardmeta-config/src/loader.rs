//! Layered configuration loading.
//!
//! A directory's settings are assembled from up to three layers, later ones
//! winning:
//! 1. Global config: `~/.shardmeta/config.toml`
//! 2. Local config: `.shardmeta/config.toml` (in the workspace)
//! 3. Caller overrides
//!
//! A layer file that does not exist is skipped. The merged result must pass
//! [`ShardMetaConfig::validate`].

use crate::error::ConfigError;
use crate::{
    CatalogConfig, ConfigOverrides, JournalMode, KeyEncoding, LogFormat, LoggingConfig,
    PartitioningConfig, SequenceConfig, ShardMetaConfig,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Directory holding a config layer, under the home directory or workspace.
const CONFIG_DIR: &str = ".shardmeta";

/// Config layer file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Assembles a [`ShardMetaConfig`] from its layers.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Directory of the global layer; `None` when there is no home directory
    global_dir: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader whose global layer lives under the user's home directory.
    pub fn new() -> Self {
        Self {
            global_dir: dirs::home_dir().map(|home| home.join(CONFIG_DIR)),
        }
    }

    /// Loader with the global layer in `global_dir`.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_dir: Some(global_dir.into()),
        }
    }

    /// Layer files for a workspace, in merge order.
    pub fn layer_paths(&self, workspace_root: &Path) -> Vec<PathBuf> {
        self.global_dir
            .iter()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .chain(std::iter::once(
                workspace_root.join(CONFIG_DIR).join(CONFIG_FILE_NAME),
            ))
            .collect()
    }

    /// Merge every layer for a workspace, apply `overrides` and validate.
    pub fn load(
        &self,
        workspace_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<ShardMetaConfig, ConfigError> {
        let mut config = ShardMetaConfig::default();

        for path in self.layer_paths(workspace_root) {
            if let Some(layer) = read_layer(&path)? {
                debug!("Merged config layer {:?}", path);
                config = merge_configs(config, layer);
            }
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parse one layer file; `None` when it does not exist.
fn read_layer(path: &Path) -> Result<Option<ShardMetaConfig>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            trace!("No config layer at {:?}", path);
            return Ok(None);
        }
        Err(source) => {
            return Err(ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    toml::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// A field in `overlay` wins only when it differs from the default, so partial
/// files do not reset values set by an earlier layer.
fn merge_configs(base: ShardMetaConfig, overlay: ShardMetaConfig) -> ShardMetaConfig {
    ShardMetaConfig {
        catalog: merge_catalog(base.catalog, overlay.catalog),
        partitioning: merge_partitioning(base.partitioning, overlay.partitioning),
        sequences: merge_sequences(base.sequences, overlay.sequences),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

/// Merge catalog config.
fn merge_catalog(base: CatalogConfig, overlay: CatalogConfig) -> CatalogConfig {
    let defaults = CatalogConfig::default();
    CatalogConfig {
        path: if overlay.path != defaults.path {
            overlay.path
        } else {
            base.path
        },
        busy_timeout_ms: if overlay.busy_timeout_ms != defaults.busy_timeout_ms {
            overlay.busy_timeout_ms
        } else {
            base.busy_timeout_ms
        },
        journal_mode: if overlay.journal_mode != JournalMode::default() {
            overlay.journal_mode
        } else {
            base.journal_mode
        },
    }
}

/// Merge partitioning config.
fn merge_partitioning(base: PartitioningConfig, overlay: PartitioningConfig) -> PartitioningConfig {
    PartitioningConfig {
        key_encoding: if overlay.key_encoding != KeyEncoding::default() {
            overlay.key_encoding
        } else {
            base.key_encoding
        },
    }
}

/// Merge sequence config.
fn merge_sequences(base: SequenceConfig, overlay: SequenceConfig) -> SequenceConfig {
    let defaults = SequenceConfig::default();
    SequenceConfig {
        shard_id: if overlay.shard_id != defaults.shard_id {
            overlay.shard_id
        } else {
            base.shard_id
        },
        shard_id_start: if overlay.shard_id_start != defaults.shard_id_start {
            overlay.shard_id_start
        } else {
            base.shard_id_start
        },
        placement_id: if overlay.placement_id != defaults.placement_id {
            overlay.placement_id
        } else {
            base.placement_id
        },
        placement_id_start: if overlay.placement_id_start != defaults.placement_id_start {
            overlay.placement_id_start
        } else {
            base.placement_id_start
        },
    }
}

/// Merge logging config.
fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    LoggingConfig {
        level: if overlay.level != "info" {
            overlay.level
        } else {
            base.level
        },
        format: if overlay.format != LogFormat::default() {
            overlay.format
        } else {
            base.format
        },
    }
}
