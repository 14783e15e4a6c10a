use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use catalog::asset::{CleanupOutcome, RawAsset};
use catalog::config::CatalogConfig;
use catalog::{CatalogService, ProductFields};
use tempfile::TempDir;
use tokio::sync::broadcast;

pub const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];
pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

pub struct Harness {
    pub dir: TempDir,
    pub config: CatalogConfig,
    pub service: Arc<CatalogService>,
}

impl Harness {
    pub fn assets_dir(&self) -> std::path::PathBuf {
        self.config.storage.resolve_paths(self.dir.path()).1
    }

    pub fn snapshot_path(&self) -> std::path::PathBuf {
        self.config.storage.resolve_paths(self.dir.path()).0
    }

    /// Names of files currently in the asset directory.
    pub fn asset_files(&self) -> Vec<String> {
        list_files(&self.assets_dir())
    }
}

/// Build a service over a fresh temp directory. Call inside a tokio runtime.
pub fn harness() -> Harness {
    harness_with(CatalogConfig::default())
}

pub fn harness_with(config: CatalogConfig) -> Harness {
    let dir = TempDir::new().unwrap();
    let service = Arc::new(CatalogService::from_config(&config, dir.path()).unwrap());
    Harness {
        dir,
        config,
        service,
    }
}

pub fn fields(title: &str, price: &str) -> ProductFields {
    ProductFields {
        title: Some(title.to_string()),
        description: Some(format!("{} description", title)),
        status: Some("active".to_string()),
        price: Some(price.to_string()),
    }
}

pub fn png(name: &str) -> RawAsset {
    RawAsset::new(name, PNG)
}

pub fn jpeg(name: &str) -> RawAsset {
    RawAsset::new(name, JPEG)
}

pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

pub async fn next_outcome(rx: &mut broadcast::Receiver<CleanupOutcome>) -> CleanupOutcome {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("cleanup outcome timed out")
        .expect("cleanup channel closed")
}
