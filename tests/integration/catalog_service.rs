use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use catalog::asset::{
    AssetStore, AssetValidator, CleanupQueue, CleanupResult, DeleteOutcome, FsAssetStore, RawAsset,
};
use catalog::config::{CatalogConfig, UploadConfig};
use catalog::{
    ApiError, CatalogService, ListQuery, ProductFields, ProductRecordStore, StorageError,
};
use tempfile::TempDir;

use crate::support::{fields, harness, harness_with, jpeg, list_files, next_outcome, png};

#[tokio::test]
async fn create_stores_numeric_price_and_persists() {
    let h = harness();
    let product = h
        .service
        .create(fields("Blue Shirt", "19.99"), vec![png("shirt.png")])
        .unwrap();

    assert_eq!(product.id, 1);
    assert_eq!(product.price, 19.99);
    assert_eq!(product.images.len(), 1);
    assert!(product.images[0].ends_with(".png"));
    assert_ne!(product.images[0], "shirt.png");
    assert_eq!(h.asset_files(), product.images);

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(h.snapshot_path()).unwrap()).unwrap();
    assert_eq!(raw[0]["price"], serde_json::json!(19.99));
    assert!(raw[0]["price"].is_f64());
}

#[tokio::test]
async fn fake_png_rejects_whole_batch() {
    let h = harness();
    let files = vec![
        png("real.png"),
        RawAsset::new("fake.png", b"<html>definitely not an image</html>".to_vec()),
    ];

    let err = h.service.create(fields("Hat", "5"), files).unwrap_err();
    assert!(matches!(err, ApiError::InvalidAsset { .. }));
    assert!(h.asset_files().is_empty());
    assert!(h.service.store().is_empty());
}

#[tokio::test]
async fn validation_error_mutates_nothing() {
    let h = harness();
    let err = h
        .service
        .create(fields("Hat", "cheap"), vec![png("a.png")])
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert!(h.asset_files().is_empty());
    assert!(!h.snapshot_path().exists());
}

#[tokio::test]
async fn update_without_files_keeps_images() {
    let h = harness();
    let created = h
        .service
        .create(fields("Mug", "4"), vec![png("a.png"), jpeg("b.jpg")])
        .unwrap();

    let updated = h
        .service
        .update(created.id, fields("Big Mug", "6.50"), Vec::new())
        .unwrap();

    assert_eq!(updated.images, created.images);
    assert_eq!(updated.title, "Big Mug");
    assert_eq!(updated.price, 6.5);
    assert_eq!(h.service.get(created.id).unwrap(), updated);
    assert_eq!(h.service.cleanup().stats().submitted, 0);
}

#[tokio::test]
async fn update_with_files_replaces_and_deletes_old_images() {
    let h = harness();
    let created = h
        .service
        .create(fields("Lamp", "30"), vec![png("a.png"), png("b.png")])
        .unwrap();
    let mut rx = h.service.cleanup().subscribe();

    let updated = h
        .service
        .update(created.id, fields("Lamp", "28"), vec![jpeg("c.jpg")])
        .unwrap();
    assert_eq!(updated.images.len(), 1);
    assert!(updated.images[0].ends_with(".jpg"));

    let mut deleted = HashSet::new();
    for _ in 0..2 {
        let outcome = next_outcome(&mut rx).await;
        assert_eq!(outcome.product_id, created.id);
        assert_eq!(outcome.result, CleanupResult::Deleted);
        deleted.insert(outcome.filename);
    }
    let old: HashSet<String> = created.images.iter().cloned().collect();
    assert_eq!(deleted, old);

    for old_image in &created.images {
        assert!(h.service.load_asset(old_image).unwrap().is_none());
    }
    assert_eq!(h.asset_files(), updated.images);
}

#[tokio::test]
async fn update_missing_product_is_not_found_and_writes_nothing() {
    let h = harness();
    let err = h
        .service
        .update(42, fields("Ghost", "1"), vec![png("a.png")])
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(42)));
    assert!(h.asset_files().is_empty());
}

#[tokio::test]
async fn update_absent_id_is_not_found_before_field_validation() {
    let h = harness();
    let err = h
        .service
        .update(42, ProductFields::default(), Vec::new())
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(42)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn update_with_bad_image_keeps_previous_state() {
    let h = harness();
    let created = h
        .service
        .create(fields("Desk", "100"), vec![png("a.png")])
        .unwrap();

    let err = h
        .service
        .update(
            created.id,
            fields("Desk v2", "90"),
            vec![RawAsset::new("b.png", b"plain text".to_vec())],
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidAsset { .. }));
    assert_eq!(h.service.get(created.id).unwrap(), created);
    assert_eq!(h.asset_files(), created.images);
}

#[tokio::test]
async fn delete_absent_is_noop() {
    let h = harness();
    h.service.create(fields("A", "1"), Vec::new()).unwrap();

    h.service.delete(999).unwrap();
    assert_eq!(h.service.store().len(), 1);
}

#[tokio::test]
async fn delete_keeps_images_by_default() {
    let h = harness();
    let created = h
        .service
        .create(fields("Chair", "40"), vec![png("a.png")])
        .unwrap();

    h.service.delete(created.id).unwrap();
    assert!(h.service.get(created.id).is_none());
    assert_eq!(h.asset_files(), created.images);
    assert_eq!(h.service.cleanup().stats().submitted, 0);
}

#[tokio::test]
async fn delete_purges_images_when_configured() {
    let mut config = CatalogConfig::default();
    config.catalog.purge_images_on_delete = true;
    let h = harness_with(config);
    let created = h
        .service
        .create(fields("Chair", "40"), vec![png("a.png")])
        .unwrap();
    let mut rx = h.service.cleanup().subscribe();

    h.service.delete(created.id).unwrap();
    let outcome = next_outcome(&mut rx).await;
    assert_eq!(outcome.filename, created.images[0]);
    assert_eq!(outcome.result, CleanupResult::Deleted);
    assert!(h.asset_files().is_empty());
}

#[tokio::test]
async fn deleting_highest_id_makes_it_reusable() {
    let h = harness();
    for i in 1..=3 {
        h.service
            .create(fields(&format!("Item {}", i), "1"), Vec::new())
            .unwrap();
    }
    assert!(h.service.store().next_id() > 3);

    h.service.delete(3).unwrap();
    let recreated = h.service.create(fields("Item 4", "1"), Vec::new()).unwrap();
    assert_eq!(recreated.id, 3);
}

#[tokio::test]
async fn list_filters_case_insensitively() {
    let h = harness();
    for title in ["Blue Shirt", "Red Hat", "white SHIRT", "Socks"] {
        h.service.create(fields(title, "1"), Vec::new()).unwrap();
    }

    let page = h
        .service
        .list(&ListQuery::new(1, 1).with_title("shirt"));
    assert_eq!(page.total, 2);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.products.len(), 1);
    assert_eq!(page.products[0].title, "Blue Shirt");
}

#[tokio::test]
async fn snapshot_reload_matches_memory() {
    let h = harness();
    h.service
        .create(fields("One", "1.25"), vec![png("a.png")])
        .unwrap();
    let two = h.service.create(fields("Two", "2"), Vec::new()).unwrap();
    h.service.create(fields("Three", "3"), Vec::new()).unwrap();
    h.service
        .update(two.id, fields("Two!", "2.5"), vec![jpeg("b.jpg")])
        .unwrap();
    h.service.delete(1).unwrap();

    let reloaded = ProductRecordStore::load(h.snapshot_path()).unwrap();
    assert_eq!(reloaded.all(), h.service.store().all());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_get_unique_ids() {
    let h = harness();
    let mut handles = Vec::new();
    for i in 0..20 {
        let service = Arc::clone(&h.service);
        handles.push(tokio::task::spawn_blocking(move || {
            service
                .create(fields(&format!("Item {}", i), "1"), vec![png("x.png")])
                .unwrap()
                .id
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }
    assert_eq!(ids, (1..=20).collect::<HashSet<u64>>());

    let reloaded = ProductRecordStore::load(h.snapshot_path()).unwrap();
    assert_eq!(reloaded.len(), 20);
    assert_eq!(h.asset_files().len(), 20);
}

/// Swap the snapshot file for a directory so the next persist fails.
fn break_snapshot(path: &std::path::Path) {
    std::fs::remove_file(path).unwrap();
    std::fs::create_dir(path).unwrap();
}

#[tokio::test]
async fn create_persist_failure_rolls_back_and_cleans_new_files() {
    let h = harness();
    let existing = h
        .service
        .create(fields("Existing", "1"), vec![png("a.png")])
        .unwrap();
    break_snapshot(&h.snapshot_path());
    let mut rx = h.service.cleanup().subscribe();

    let err = h
        .service
        .create(fields("Doomed", "2"), vec![jpeg("b.jpg")])
        .unwrap_err();
    assert!(matches!(err, ApiError::Storage(_)), "unexpected error: {err:?}");
    assert_eq!(h.service.store().all(), vec![existing.clone()]);

    let outcome = next_outcome(&mut rx).await;
    assert!(outcome.filename.ends_with(".jpg"));
    assert_eq!(outcome.result, CleanupResult::Deleted);
    assert_eq!(h.asset_files(), existing.images);
}

#[tokio::test]
async fn update_persist_failure_restores_record_and_keeps_old_images() {
    let h = harness();
    let created = h
        .service
        .create(fields("Lamp", "30"), vec![png("a.png")])
        .unwrap();
    break_snapshot(&h.snapshot_path());
    let mut rx = h.service.cleanup().subscribe();

    let err = h
        .service
        .update(created.id, fields("Lamp v2", "25"), vec![jpeg("b.jpg")])
        .unwrap_err();
    assert!(matches!(err, ApiError::Storage(_)), "unexpected error: {err:?}");
    assert_eq!(h.service.get(created.id).unwrap(), created);

    let outcome = next_outcome(&mut rx).await;
    assert!(outcome.filename.ends_with(".jpg"));
    assert_eq!(outcome.result, CleanupResult::Deleted);
    assert_eq!(h.asset_files(), created.images);
    assert_eq!(h.service.cleanup().stats().submitted, 1);
}

/// Filesystem store whose Nth save fails.
struct FlakyAssetStore {
    inner: FsAssetStore,
    saves: AtomicUsize,
    fail_on: usize,
}

impl AssetStore for FlakyAssetStore {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<(), ApiError> {
        let attempt = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.fail_on {
            return Err(ApiError::Storage(StorageError::IoError(
                std::io::Error::other("disk full"),
            )));
        }
        self.inner.save(filename, bytes)
    }

    fn delete(&self, filename: &str) -> Result<DeleteOutcome, ApiError> {
        self.inner.delete(filename)
    }

    fn load(&self, filename: &str) -> Result<Option<Vec<u8>>, ApiError> {
        self.inner.load(filename)
    }

    fn url_for(&self, filename: &str) -> String {
        self.inner.url_for(filename)
    }
}

#[tokio::test]
async fn failed_save_removes_files_already_written_for_request() {
    let dir = TempDir::new().unwrap();
    let assets_dir = dir.path().join("assets");
    let assets: Arc<dyn AssetStore> = Arc::new(FlakyAssetStore {
        inner: FsAssetStore::new(&assets_dir, "http://localhost:8000").unwrap(),
        saves: AtomicUsize::new(0),
        fail_on: 2,
    });
    let store = Arc::new(ProductRecordStore::load(dir.path().join("products.json")).unwrap());
    let cleanup = Arc::new(CleanupQueue::start(Arc::clone(&assets)).unwrap());
    let service = CatalogService::new(
        store,
        assets,
        AssetValidator::new(UploadConfig::default()),
        cleanup,
    );

    let err = service
        .create(
            fields("Gallery", "1"),
            vec![png("a.png"), png("b.png"), jpeg("c.jpg")],
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::Storage(_)), "unexpected error: {err:?}");
    assert!(list_files(&assets_dir).is_empty());
    assert!(service.store().is_empty());
    assert!(!dir.path().join("products.json").exists());
}
