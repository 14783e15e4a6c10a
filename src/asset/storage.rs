//! Asset storage: physical image files addressed by generated filename.

use crate::error::{ApiError, StorageError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of an idempotent delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Storage port for image files
pub trait AssetStore: Send + Sync {
    /// Write `bytes` under `filename`.
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<(), ApiError>;
    /// Remove `filename`. A missing file is reported, not failed.
    fn delete(&self, filename: &str) -> Result<DeleteOutcome, ApiError>;
    /// Read a stored asset, `None` when absent.
    fn load(&self, filename: &str) -> Result<Option<Vec<u8>>, ApiError>;
    /// External locator for `filename`. No I/O.
    fn url_for(&self, filename: &str) -> String;
}

/// Reject anything that is not a single plain path segment.
pub fn check_filename(filename: &str) -> Result<(), ApiError> {
    let unsafe_name = filename.is_empty()
        || filename == "."
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains('\0');
    if unsafe_name {
        return Err(ApiError::invalid_asset(filename, "unsafe asset filename"));
    }
    Ok(())
}

/// Build the external locator `<base_url>/assets/<filename>`.
pub fn asset_locator(base_url: &str, filename: &str) -> String {
    format!("{}/assets/{}", base_url.trim_end_matches('/'), filename)
}

/// Filesystem-backed asset store
pub struct FsAssetStore {
    root: PathBuf,
    base_url: String,
}

impl FsAssetStore {
    /// Create the store, making sure the asset directory exists.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Result<Self, ApiError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            warn!(dir = %root.display(), error = %e, "Failed to create asset directory");
            ApiError::Storage(StorageError::IoError(e))
        })?;
        Ok(Self {
            root,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf, ApiError> {
        check_filename(filename)?;
        Ok(self.root.join(filename))
    }
}

impl AssetStore for FsAssetStore {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<(), ApiError> {
        let path = self.path_for(filename)?;
        let temp_path = self.root.join(format!(".{}.part", filename));

        let result = (|| -> std::io::Result<()> {
            let mut file = std::fs::File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            drop(file);
            std::fs::rename(&temp_path, &path)
        })();

        if let Err(e) = result {
            warn!(filename, error = %e, "Asset write failed");
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }

        debug!(filename, size = bytes.len(), "Saved asset");
        Ok(())
    }

    fn delete(&self, filename: &str) -> Result<DeleteOutcome, ApiError> {
        let path = self.path_for(filename)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(filename, "Deleted asset");
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(filename, "Asset already absent");
                Ok(DeleteOutcome::NotFound)
            }
            Err(e) => {
                warn!(filename, error = %e, "Asset delete failed");
                Err(e.into())
            }
        }
    }

    fn load(&self, filename: &str) -> Result<Option<Vec<u8>>, ApiError> {
        let path = self.path_for(filename)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn url_for(&self, filename: &str) -> String {
        asset_locator(&self.base_url, filename)
    }
}
