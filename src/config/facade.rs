//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::CatalogConfig;
use config::ConfigError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from `<base_dir>/catalog.toml` (if present) and environment.
    pub fn load(base_dir: &Path) -> Result<CatalogConfig, ConfigError> {
        MergeService::load(base_dir)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<CatalogConfig, ConfigError> {
        MergeService::load_from_file(path)
    }

    /// Create default configuration.
    pub fn default() -> CatalogConfig {
        CatalogConfig::default()
    }
}
