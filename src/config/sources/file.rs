//! TOML file sources.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::{File, FileFormat};
use std::path::Path;

/// Default config file name looked up in the base directory
pub const CONFIG_FILE_NAME: &str = "catalog.toml";

/// Add `<base_dir>/catalog.toml` if it exists.
pub fn add_default_file(
    builder: ConfigBuilder<DefaultState>,
    base_dir: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = base_dir.join(CONFIG_FILE_NAME);
    Ok(builder.add_source(File::from(path).format(FileFormat::Toml).required(false)))
}

/// Add a required config file given on the command line.
pub fn add_explicit_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    Ok(builder.add_source(File::from(path).format(FileFormat::Toml).required(true)))
}
