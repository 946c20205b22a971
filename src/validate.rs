//! Client-side image validation.
//!
//! Runs on the declared metadata of a selection before anything touches
//! the network. The declared MIME type is trusted as-is; content sniffing
//! is left to the server.

use crate::error::{SourceError, ValidationError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/jpg"];

/// 5 MB, decimal.
pub const MAX_FILE_SIZE_BYTES: u64 = 5_000_000;

/// Declared metadata for a candidate image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Check type, then size.
pub fn validate(file: &FileMeta) -> Result<(), ValidationError> {
    if !ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
        return Err(ValidationError::InvalidType {
            mime_type: file.mime_type.clone(),
        });
    }
    if file.size_bytes > MAX_FILE_SIZE_BYTES {
        return Err(ValidationError::TooLarge {
            size_bytes: file.size_bytes,
            limit_bytes: MAX_FILE_SIZE_BYTES,
        });
    }
    Ok(())
}

/// Where a selection's bytes live.
#[derive(Debug, Clone)]
enum Origin {
    File(PathBuf),
    Memory(Arc<Vec<u8>>),
}

/// A locally available image the user picked, captured, or dropped.
#[derive(Debug, Clone)]
pub struct ImageSelection {
    pub uri: String,
    pub file_name: String,
    pub meta: FileMeta,
    origin: Origin,
}

impl ImageSelection {
    /// Describe a file on disk. The MIME type is declared from the extension.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(SourceError::NoImage(path.display().to_string()));
        }
        let mime_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());

        Ok(Self {
            uri: format!("file://{}", path.display()),
            file_name,
            meta: FileMeta {
                mime_type,
                size_bytes: metadata.len(),
            },
            origin: Origin::File(path.to_path_buf()),
        })
    }

    /// Wrap bytes that are already in memory (camera frames, re-encoded uploads).
    pub fn from_bytes(
        uri: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        let size_bytes = bytes.len() as u64;
        Self {
            uri: uri.into(),
            file_name: file_name.into(),
            meta: FileMeta {
                mime_type: mime_type.into(),
                size_bytes,
            },
            origin: Origin::Memory(Arc::new(bytes)),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate(&self.meta)
    }

    /// Read the bytes for upload.
    pub async fn load(&self) -> Result<ImagePayload, SourceError> {
        let bytes = match &self.origin {
            Origin::File(path) => Arc::new(tokio::fs::read(path).await?),
            Origin::Memory(bytes) => Arc::clone(bytes),
        };
        Ok(ImagePayload {
            file_name: self.file_name.clone(),
            mime_type: self.meta.mime_type.clone(),
            bytes,
        })
    }
}

/// Loaded image bytes, held for the lifetime of the selection.
///
/// Retries reuse the same payload so the request is identical.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<Vec<u8>>,
}

impl ImagePayload {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
