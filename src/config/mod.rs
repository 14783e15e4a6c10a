//! Configuration
//!
//! Layered configuration: built-in defaults, an optional TOML file, then
//! `CATALOG__SECTION__KEY` environment variables.

pub mod facade;
pub mod merge;
pub mod sources;
pub mod storage;

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

pub use facade::ConfigLoader;
pub use storage::StorageConfig;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
    pub catalog: CatalogBehavior,
    pub logging: LoggingConfig,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Prefix for asset locators (`<base_url>/assets/<filename>`)
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_url: default_base_url(),
        }
    }
}

fn default_max_files() -> usize {
    10
}

fn default_max_file_bytes() -> usize {
    5 * 1024 * 1024
}

/// Upload limits enforced before any bytes are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum image files per request
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum size of a single image file
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

/// Catalog behavior switches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogBehavior {
    /// Delete a product's image files when the product is deleted.
    /// Off by default: deletion leaves images on disk.
    #[serde(default)]
    pub purge_images_on_delete: bool,
}
