//! MergeService: orchestrates sources and deserializes to CatalogConfig.

use crate::config::sources::{environment, file};
use crate::config::CatalogConfig;
use config::{Config, ConfigError};
use std::path::Path;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Load config from the base directory and environment.
    /// Precedence: defaults (lowest) -> catalog.toml -> environment (highest).
    pub fn load(base_dir: &Path) -> Result<CatalogConfig, ConfigError> {
        let builder = Config::builder();
        let builder = file::add_default_file(builder, base_dir)?;
        let builder = environment::add_to_builder(builder)?;

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load config from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<CatalogConfig, ConfigError> {
        let builder = Config::builder();
        let builder = file::add_explicit_file(builder, path)?;
        let builder = environment::add_to_builder(builder)?;

        let config = builder.build()?;
        config.try_deserialize()
    }
}
