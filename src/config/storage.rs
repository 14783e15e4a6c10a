//! StorageConfig and resolve_paths for the snapshot and asset directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("data/products.json")
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("data/assets")
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Product snapshot file (relative paths resolve against the base dir)
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Directory holding uploaded images
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
}

impl StorageConfig {
    /// Resolve storage paths to actual filesystem locations.
    ///
    /// Returns `(snapshot_path, assets_dir)`.
    pub fn resolve_paths(&self, base_dir: &Path) -> (PathBuf, PathBuf) {
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base_dir.join(p)
            }
        };
        (resolve(&self.snapshot_path), resolve(&self.assets_dir))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            assets_dir: default_assets_dir(),
        }
    }
}
