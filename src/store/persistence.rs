//! Snapshot persistence for the product record set.
//!
//! The entire set is serialized as one JSON array. Writes go to a temp file
//! in the same directory and are renamed over the snapshot, so a reader never
//! observes a partially written file.

use super::Product;
use crate::error::StorageError;
use crate::types::ProductId;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Snapshot file location and read/write cycle
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }

    /// Read the snapshot. Absent file means no records.
    pub fn read(&self) -> Result<Vec<Product>, StorageError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No snapshot file, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StorageError::IoError(e)),
        };

        let records: Vec<Product> =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::CorruptSnapshot {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut seen: HashSet<ProductId> = HashSet::with_capacity(records.len());
        for record in &records {
            if record.id == 0 || !seen.insert(record.id) {
                return Err(StorageError::CorruptSnapshot {
                    path: self.path.display().to_string(),
                    reason: format!("invalid or duplicate product id {}", record.id),
                });
            }
        }

        Ok(records)
    }

    /// Atomically replace the snapshot with `records`.
    pub fn write(&self, records: &[Product]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_vec_pretty(records)?;
        let temp_path = self.temp_path();

        let result = (|| -> Result<(), StorageError> {
            let mut file = std::fs::File::create(&temp_path)?;
            file.write_all(&content)?;
            file.sync_all()?;
            drop(file);
            std::fs::rename(&temp_path, &self.path)?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                debug!(
                    path = %self.path.display(),
                    count = records.len(),
                    bytes = content.len(),
                    "Persisted product snapshot"
                );
                Ok(())
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Snapshot write failed");
                let _ = std::fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}

/// On-disk product shape accepted when loading.
///
/// Besides the current `images` array of filenames, older snapshots stored
/// full locators, or a single comma-joined `image` string. Older writers
/// also emitted `"price": null` for unparseable prices; those load as `0.0`.
#[derive(Debug, Deserialize)]
pub(crate) struct StoredProduct {
    id: ProductId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    images: Option<Vec<String>>,
    #[serde(default)]
    image: Option<String>,
}

impl From<StoredProduct> for Product {
    fn from(stored: StoredProduct) -> Self {
        let references: Vec<String> = match (stored.images, stored.image) {
            (Some(images), _) => images,
            (None, Some(joined)) => joined.split(',').map(str::to_string).collect(),
            (None, None) => Vec::new(),
        };

        let images = references
            .iter()
            .filter_map(|r| asset_filename(r))
            .collect();

        let price = stored.price.unwrap_or_else(|| {
            warn!(id = stored.id, "Product has no numeric price, loading as 0.0");
            0.0
        });

        Product {
            id: stored.id,
            title: stored.title,
            description: stored.description,
            status: stored.status,
            price,
            images,
        }
    }
}

/// Reduce an asset reference (bare filename or locator) to its filename.
pub fn asset_filename(reference: &str) -> Option<String> {
    let trimmed = reference.trim();
    let without_query = trimmed.split(['?', '#']).next().unwrap_or_default();
    let name = without_query.rsplit('/').next().unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        if !trimmed.is_empty() {
            warn!(reference = trimmed, "Dropping unusable asset reference");
        }
        return None;
    }
    Some(name.to_string())
}
