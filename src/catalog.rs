//! Catalog Service
//!
//! Composes the record store, asset validation, asset storage, and the
//! orphan cleanup queue into create/update/delete semantics.
//!
//! Ordering rules:
//! - update checks the id exists before validating fields
//! - field validation and not-found checks run before anything is written
//! - uploads are validated as a batch before any file is saved
//! - previous images are queued for deletion only after the replacement
//!   record has been persisted

use crate::asset::{
    AcceptedAsset, AssetStore, AssetValidator, CleanupQueue, FsAssetStore, ImageKind, RawAsset,
};
use crate::config::CatalogConfig;
use crate::error::ApiError;
use crate::store::{ListQuery, Product, ProductPage, ProductRecordStore};
use crate::types::ProductId;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Raw product fields as submitted by a client
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    /// Decimal text, e.g. `"19.99"`
    pub price: Option<String>,
}

/// Product fields after validation
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub status: String,
    pub price: f64,
}

impl ProductFields {
    /// Check presence of every field and parse the price.
    pub fn validate(self) -> Result<ProductDraft, ApiError> {
        let title = require("title", self.title)?;
        if title.trim().is_empty() {
            return Err(ApiError::Validation("title must not be blank".to_string()));
        }
        let description = require("description", self.description)?;
        let status = require("status", self.status)?;
        let raw_price = require("price", self.price)?;
        let price = parse_price(&raw_price)?;

        Ok(ProductDraft {
            title,
            description,
            status,
            price,
        })
    }
}

fn require(field: &str, value: Option<String>) -> Result<String, ApiError> {
    value.ok_or_else(|| ApiError::Validation(format!("{} is required", field)))
}

/// Parse a non-negative, finite decimal price.
pub fn parse_price(raw: &str) -> Result<f64, ApiError> {
    let price: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::Validation(format!("price '{}' is not a number", raw)))?;
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::Validation(format!(
            "price must be a non-negative number, got '{}'",
            raw
        )));
    }
    Ok(price)
}

/// Catalog service
pub struct CatalogService {
    store: Arc<ProductRecordStore>,
    assets: Arc<dyn AssetStore>,
    validator: AssetValidator,
    cleanup: Arc<CleanupQueue>,
    purge_images_on_delete: bool,
}

impl CatalogService {
    pub fn new(
        store: Arc<ProductRecordStore>,
        assets: Arc<dyn AssetStore>,
        validator: AssetValidator,
        cleanup: Arc<CleanupQueue>,
    ) -> Self {
        Self {
            store,
            assets,
            validator,
            cleanup,
            purge_images_on_delete: false,
        }
    }

    /// Also delete a product's images when the product is deleted.
    pub fn with_purge_on_delete(mut self, purge: bool) -> Self {
        self.purge_images_on_delete = purge;
        self
    }

    /// Build the service from configuration, resolving relative paths
    /// against `base_dir`. Must run inside a tokio runtime.
    pub fn from_config(config: &CatalogConfig, base_dir: &Path) -> Result<Self, ApiError> {
        let (snapshot_path, assets_dir) = config.storage.resolve_paths(base_dir);
        let store = Arc::new(ProductRecordStore::load(snapshot_path)?);
        let assets: Arc<dyn AssetStore> =
            Arc::new(FsAssetStore::new(assets_dir, config.server.base_url.clone())?);
        let cleanup = Arc::new(CleanupQueue::start(Arc::clone(&assets))?);
        let validator = AssetValidator::new(config.uploads.clone());

        Ok(Self::new(store, assets, validator, cleanup)
            .with_purge_on_delete(config.catalog.purge_images_on_delete))
    }

    pub fn store(&self) -> &ProductRecordStore {
        &self.store
    }

    pub fn cleanup(&self) -> &CleanupQueue {
        &self.cleanup
    }

    pub fn validator(&self) -> &AssetValidator {
        &self.validator
    }

    pub fn list(&self, query: &ListQuery) -> ProductPage {
        self.store.list(query)
    }

    pub fn get(&self, id: ProductId) -> Option<Product> {
        self.store.get_by_id(id)
    }

    /// External locator for a stored asset.
    pub fn asset_url(&self, filename: &str) -> String {
        self.assets.url_for(filename)
    }

    /// Read a stored asset along with its detected format.
    pub fn load_asset(
        &self,
        filename: &str,
    ) -> Result<Option<(Vec<u8>, Option<ImageKind>)>, ApiError> {
        Ok(self.assets.load(filename)?.map(|bytes| {
            let kind = ImageKind::detect(&bytes);
            (bytes, kind)
        }))
    }

    /// Create a product, storing any uploaded images.
    pub fn create(&self, fields: ProductFields, files: Vec<RawAsset>) -> Result<Product, ApiError> {
        let draft = fields.validate()?;
        let accepted = self.validator.validate(&files)?;
        let images = self.save_assets(&accepted)?;

        let mut writer = self.store.write();
        let product = Product {
            id: writer.next_id(),
            title: draft.title,
            description: draft.description,
            status: draft.status,
            price: draft.price,
            images,
        };
        writer.insert(product.clone());

        if let Err(e) = writer.persist() {
            error!(id = product.id, error = %e, "Failed to persist new product");
            self.cleanup.submit(product.id, product.images);
            return Err(e);
        }

        info!(
            id = product.id,
            images = product.images.len(),
            "Created product"
        );
        Ok(product)
    }

    /// Replace a product's fields, and its images when files are given.
    ///
    /// With no files the existing image list is kept as is. With files, the
    /// list is replaced wholesale and the previous files are queued for
    /// deletion once the new record is persisted.
    pub fn update(
        &self,
        id: ProductId,
        fields: ProductFields,
        files: Vec<RawAsset>,
    ) -> Result<Product, ApiError> {
        if self.store.get_by_id(id).is_none() {
            return Err(ApiError::NotFound(id));
        }
        let draft = fields.validate()?;

        let accepted = self.validator.validate(&files)?;
        let new_images = self.save_assets(&accepted)?;
        let replacing_images = !new_images.is_empty();

        let mut writer = self.store.write();
        let Some(current_images) = writer.get(id).map(|current| current.images.clone()) else {
            // Deleted between the check and the lock
            drop(writer);
            self.cleanup.submit(id, new_images);
            return Err(ApiError::NotFound(id));
        };

        let updated = Product {
            id,
            title: draft.title,
            description: draft.description,
            status: draft.status,
            price: draft.price,
            images: if replacing_images {
                new_images.clone()
            } else {
                current_images.clone()
            },
        };
        writer.replace(id, updated.clone())?;

        if let Err(e) = writer.persist() {
            error!(id, error = %e, "Failed to persist product update");
            self.cleanup.submit(id, new_images);
            return Err(e);
        }

        if replacing_images {
            let orphaned: Vec<String> = current_images
                .into_iter()
                .filter(|old| !new_images.contains(old))
                .collect();
            info!(
                id,
                replaced = orphaned.len(),
                added = new_images.len(),
                "Replaced product images"
            );
            self.cleanup.submit(id, orphaned);
        }

        info!(id, "Updated product");
        Ok(updated)
    }

    /// Delete a product. Absent ids succeed without change.
    pub fn delete(&self, id: ProductId) -> Result<(), ApiError> {
        let mut writer = self.store.write();
        let removed = writer.remove(id);
        writer.persist()?;

        match removed {
            Some(product) => {
                info!(id, images = product.images.len(), "Deleted product");
                if self.purge_images_on_delete {
                    self.cleanup.submit(id, product.images);
                }
            }
            None => info!(id, "Delete requested for absent product"),
        }
        Ok(())
    }

    /// Stop the cleanup worker after draining queued deletions.
    pub async fn shutdown(&self) {
        self.cleanup.shutdown().await;
    }

    /// Save every accepted asset. On failure, remove what this batch wrote.
    fn save_assets(&self, accepted: &[AcceptedAsset]) -> Result<Vec<String>, ApiError> {
        let mut saved: Vec<String> = Vec::with_capacity(accepted.len());
        for asset in accepted {
            if let Err(e) = self.assets.save(&asset.filename, &asset.bytes) {
                warn!(
                    filename = %asset.filename,
                    written = saved.len(),
                    error = %e,
                    "Asset batch write failed, removing partial batch"
                );
                for filename in &saved {
                    if let Err(cleanup_err) = self.assets.delete(filename) {
                        error!(filename = %filename, error = %cleanup_err, "Failed to remove partial upload");
                    }
                }
                return Err(e);
            }
            saved.push(asset.filename.clone());
        }
        Ok(saved)
    }
}
