//! Image assets: validation, storage, and orphan cleanup.

pub mod cleanup;
pub mod storage;
pub mod validator;

pub use cleanup::{CleanupOutcome, CleanupQueue, CleanupResult, CleanupStats};
pub use storage::{asset_locator, AssetStore, DeleteOutcome, FsAssetStore};
pub use validator::{AssetValidator, ImageKind};

/// Uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct RawAsset {
    /// Client-declared filename; used for diagnostics only
    pub declared_name: String,
    pub bytes: Vec<u8>,
}

impl RawAsset {
    pub fn new(declared_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            declared_name: declared_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Upload that passed signature checks and has its storage name
#[derive(Debug, Clone)]
pub struct AcceptedAsset {
    pub filename: String,
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}
