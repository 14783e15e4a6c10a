//! Magic-byte validation of uploaded images.
//!
//! The declared filename and content type are never trusted. The type comes
//! from the leading bytes of the content, and the stored name is generated.

use super::{AcceptedAsset, RawAsset};
use crate::config::UploadConfig;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Number of leading bytes inspected for a signature
pub const SIGNATURE_PREFIX_LEN: usize = 12;

/// Accepted image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    /// Identify the format from the content prefix.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        let prefix = &bytes[..bytes.len().min(SIGNATURE_PREFIX_LEN)];
        if prefix.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageKind::Jpeg);
        }
        if prefix.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageKind::Png);
        }
        if prefix.starts_with(b"GIF87a") || prefix.starts_with(b"GIF89a") {
            return Some(ImageKind::Gif);
        }
        if prefix.len() == SIGNATURE_PREFIX_LEN && &prefix[..4] == b"RIFF" && &prefix[8..12] == b"WEBP"
        {
            return Some(ImageKind::Webp);
        }
        None
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
            ImageKind::Webp => "image/webp",
        }
    }
}

/// Batch validator for uploads
#[derive(Debug, Clone)]
pub struct AssetValidator {
    limits: UploadConfig,
}

impl AssetValidator {
    pub fn new(limits: UploadConfig) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &UploadConfig {
        &self.limits
    }

    /// Validate a batch and name every file.
    ///
    /// All or nothing: the first rejected file fails the whole batch.
    pub fn validate(&self, files: &[RawAsset]) -> Result<Vec<AcceptedAsset>, ApiError> {
        if files.len() > self.limits.max_files {
            warn!(
                count = files.len(),
                max = self.limits.max_files,
                "Upload batch exceeds file limit"
            );
            return Err(ApiError::invalid_asset(
                "images",
                format!("at most {} files per request", self.limits.max_files),
            ));
        }

        let mut accepted = Vec::with_capacity(files.len());
        for file in files {
            let kind = self.check(file)?;
            let filename = generate_filename(kind);
            debug!(
                declared = %file.declared_name,
                filename = %filename,
                kind = ?kind,
                size = file.bytes.len(),
                "Accepted upload"
            );
            accepted.push(AcceptedAsset {
                filename,
                kind,
                bytes: file.bytes.clone(),
            });
        }
        Ok(accepted)
    }

    fn check(&self, file: &RawAsset) -> Result<ImageKind, ApiError> {
        if file.bytes.is_empty() {
            return Err(ApiError::invalid_asset(&file.declared_name, "file is empty"));
        }
        if file.bytes.len() > self.limits.max_file_bytes {
            return Err(ApiError::invalid_asset(
                &file.declared_name,
                format!("file exceeds {} bytes", self.limits.max_file_bytes),
            ));
        }
        ImageKind::detect(&file.bytes).ok_or_else(|| {
            warn!(declared = %file.declared_name, "Upload content is not a supported image");
            ApiError::invalid_asset(
                &file.declared_name,
                "content is not a JPEG, PNG, GIF or WEBP image",
            )
        })
    }
}

/// Random storage name with an extension taken from the detected format.
fn generate_filename(kind: ImageKind) -> String {
    format!("{}.{}", uuid::Uuid::new_v4().simple(), kind.extension())
}
