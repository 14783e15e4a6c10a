//! Product Record Store
//!
//! Owns the authoritative set of product records and their identifiers.
//! The whole set lives behind one lock and is written to a snapshot file
//! as a unit after every mutation.

pub mod persistence;
pub mod query;

use crate::error::ApiError;
use crate::types::ProductId;
use parking_lot::{RwLock, RwLockWriteGuard};
use persistence::{SnapshotFile, StoredProduct};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub use query::{ListQuery, ProductPage};

/// Product: a catalog record
///
/// `images` holds stored asset filenames. External locators are derived at
/// the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredProduct")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub status: String,
    pub price: f64,
    pub images: Vec<String>,
}

/// Compute the next identifier: `max(existing ids, default 0) + 1`.
///
/// Recomputed from contents on every call, so deleting the highest id makes
/// it available again.
pub fn next_id(records: &[Product]) -> ProductId {
    records.iter().map(|p| p.id).max().unwrap_or(0) + 1
}

/// Product record store backed by a JSON snapshot file
pub struct ProductRecordStore {
    records: RwLock<Vec<Product>>,
    snapshot: SnapshotFile,
}

impl ProductRecordStore {
    /// Load the store from `path`. A missing file yields an empty store;
    /// a file that is present but unreadable as a product array is fatal.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let snapshot = SnapshotFile::new(path);
        let records = snapshot.read()?;
        info!(
            path = %snapshot.path().display(),
            count = records.len(),
            "Loaded product snapshot"
        );
        Ok(Self {
            records: RwLock::new(records),
            snapshot,
        })
    }

    /// Build a store over existing records without reading from disk.
    pub fn with_records(path: impl Into<PathBuf>, records: Vec<Product>) -> Self {
        Self {
            records: RwLock::new(records),
            snapshot: SnapshotFile::new(path),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        self.snapshot.path()
    }

    /// Filter by title and paginate.
    pub fn list(&self, query: &ListQuery) -> ProductPage {
        let records = self.records.read();
        query::paginate(&records, query)
    }

    pub fn get_by_id(&self, id: ProductId) -> Option<Product> {
        self.records.read().iter().find(|p| p.id == id).cloned()
    }

    pub fn next_id(&self) -> ProductId {
        next_id(&self.records.read())
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Copy of every record in stored order.
    pub fn all(&self) -> Vec<Product> {
        self.records.read().clone()
    }

    /// Write the current set to the snapshot file.
    ///
    /// Takes the write lock: every snapshot write shares one temp file, so
    /// writes must be serialized with each other and with mutations.
    pub fn persist(&self) -> Result<(), ApiError> {
        let records = self.records.write();
        self.snapshot.write(&records)?;
        Ok(())
    }

    /// Acquire exclusive access for a mutate-then-persist sequence.
    ///
    /// Mutations made through the writer are rolled back unless
    /// [`RecordSetWriter::persist`] succeeds.
    pub fn write(&self) -> RecordSetWriter<'_> {
        RecordSetWriter {
            records: self.records.write(),
            original: None,
            snapshot: &self.snapshot,
        }
    }
}

/// Exclusive handle over the record set
pub struct RecordSetWriter<'a> {
    records: RwLockWriteGuard<'a, Vec<Product>>,
    /// Contents before the first mutation; restored if persist never succeeds
    original: Option<Vec<Product>>,
    snapshot: &'a SnapshotFile,
}

impl RecordSetWriter<'_> {
    fn checkpoint(&mut self) {
        if self.original.is_none() {
            self.original = Some(self.records.clone());
        }
    }

    pub fn next_id(&self) -> ProductId {
        next_id(&self.records)
    }

    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.records.iter().find(|p| p.id == id)
    }

    /// Append a record. The caller assigns `id` from [`Self::next_id`].
    pub fn insert(&mut self, product: Product) {
        self.checkpoint();
        debug!(id = product.id, "Inserting product");
        self.records.push(product);
    }

    /// Swap the record with `id` in place, returning the previous value.
    pub fn replace(&mut self, id: ProductId, mut product: Product) -> Result<Product, ApiError> {
        let index = self
            .records
            .iter()
            .position(|p| p.id == id)
            .ok_or(ApiError::NotFound(id))?;
        self.checkpoint();
        product.id = id;
        debug!(id, "Replacing product");
        Ok(std::mem::replace(&mut self.records[index], product))
    }

    /// Remove the record with `id`. Absent ids are a no-op.
    pub fn remove(&mut self, id: ProductId) -> Option<Product> {
        let index = self.records.iter().position(|p| p.id == id)?;
        self.checkpoint();
        debug!(id, "Removing product");
        Some(self.records.remove(index))
    }

    /// Persist the whole set and release the lock.
    pub fn persist(mut self) -> Result<(), ApiError> {
        self.snapshot.write(&self.records)?;
        self.original = None;
        Ok(())
    }
}

impl Drop for RecordSetWriter<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            warn!(
                path = %self.snapshot.path().display(),
                "Unpersisted mutation discarded, restoring previous record set"
            );
            *self.records = original;
        }
    }
}
