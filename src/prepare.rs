//! Optional shrink-before-upload.
//!
//! Large camera frames are resized so the longest side fits
//! `max_dimension` and re-encoded as JPEG. Images that already fit are
//! passed through byte-for-byte.

use crate::error::PrepareError;
use crate::validate::{ImageSelection, ALLOWED_MIME_TYPES};
use image::imageops::FilterType;

pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

const JPEG_QUALITY: u8 = 90;

/// Returns re-encoded JPEG bytes, or `None` when no resize is needed.
pub fn downscale(bytes: &[u8], max_dimension: u32) -> Result<Option<Vec<u8>>, PrepareError> {
    let start = std::time::Instant::now();
    let img = image::load_from_memory(bytes).map_err(PrepareError::Decode)?;
    let (width, height) = (img.width(), img.height());
    if width <= max_dimension && height <= max_dimension {
        return Ok(None);
    }

    let resized = img.resize(max_dimension, max_dimension, FilterType::Lanczos3);
    let rgb = resized.to_rgb8();

    let mut out = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    rgb.write_with_encoder(encoder).map_err(PrepareError::Encode)?;

    log::info!(
        "[PREPARE] {}x{} → {}x{} JPEG ({} → {} bytes) in {}ms",
        width,
        height,
        rgb.width(),
        rgb.height(),
        bytes.len(),
        out.len(),
        start.elapsed().as_millis()
    );
    Ok(Some(out))
}

/// Apply `downscale` to a selection, producing an in-memory JPEG selection
/// when a resize happened.
///
/// Selections with a disallowed type are returned untouched so validation
/// still rejects them.
pub async fn prepare_selection(
    selection: ImageSelection,
    max_dimension: u32,
) -> Result<ImageSelection, PrepareError> {
    if !ALLOWED_MIME_TYPES.contains(&selection.meta.mime_type.as_str()) {
        return Ok(selection);
    }
    let payload = match selection.load().await {
        Ok(payload) => payload,
        // Let the workflow report unreadable files.
        Err(_) => return Ok(selection),
    };
    match downscale(&payload.bytes, max_dimension)? {
        Some(jpeg) => {
            let stem = std::path::Path::new(&selection.file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "image".to_string());
            Ok(ImageSelection::from_bytes(
                selection.uri.clone(),
                format!("{}.jpg", stem),
                "image/jpeg",
                jpeg,
            ))
        }
        None => Ok(selection),
    }
}
