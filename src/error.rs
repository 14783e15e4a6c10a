//! Error types for the catalog service.

use crate::types::ProductId;
use thiserror::Error;

/// Failures of the snapshot file and the asset directory.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Corrupt snapshot {path}: {reason}")]
    CorruptSnapshot { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Errors surfaced by catalog operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed product fields.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uploaded bytes rejected before anything was written.
    #[error("Invalid asset '{name}': {reason}")]
    InvalidAsset { name: String, reason: String },

    #[error("Product not found: {0}")]
    NotFound(ProductId),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A runtime precondition was not met, e.g. no tokio runtime.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl ApiError {
    pub fn invalid_asset(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ApiError::InvalidAsset {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status code equivalent.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation(_) | ApiError::InvalidAsset { .. } => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Storage(_) | ApiError::ConfigError(_) | ApiError::Runtime(_) => 500,
        }
    }

    /// Message safe to hand to a client. Internal details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::InvalidAsset { name, reason } => format!("Invalid image '{}': {}", name, reason),
            ApiError::NotFound(_) => "Product not found".to_string(),
            ApiError::Storage(_) | ApiError::ConfigError(_) | ApiError::Runtime(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Storage(StorageError::IoError(err))
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
