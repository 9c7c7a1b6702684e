//! Image gatekeeper: decide whether a file may enter the pipeline.
//!
//! Two checks, in order:
//!
//! 1. **Extension**: one of [`SUPPORTED_EXTENSIONS`], case-insensitive. The
//!    folder driver uses [`is_supported`] to leave other files out of the
//!    batch entirely.
//! 2. **Resolution**: the decoded raster must be at least `min_dimension`
//!    pixels in both directions. Decode failures and small images are both
//!    reported as [`FileError::LowQuality`].
//!
//! The raster is fully decoded here (not just the header) so a truncated
//! file is caught before the OCR engine is started, and the decoded image is
//! handed on to the preprocessor instead of being read twice.

use crate::error::FileError;
use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Raster formats accepted by the pipeline (lowercase, without the dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "bmp", "gif"];

/// An image that passed the gatekeeper.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    pub path: PathBuf,
    pub image: DynamicImage,
}

impl ValidatedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Lowercased extension of `path`, if it has one.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Whether `path` has a supported raster extension.
pub fn is_supported(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Check the resolution threshold.
///
/// Returns the human-readable rejection reason on failure.
pub fn check_resolution(width: u32, height: u32, min_dimension: u32) -> Result<(), String> {
    if width < min_dimension || height < min_dimension {
        return Err(format!(
            "Image resolution is too low ({width}×{height}, minimum {min_dimension}×{min_dimension})."
        ));
    }
    Ok(())
}

/// Decode `path` and apply both gate checks. Blocking.
pub fn inspect_image(path: &Path, min_dimension: u32) -> Result<ValidatedImage, FileError> {
    if !is_supported(path) {
        return Err(FileError::UnsupportedFormat {
            extension: extension_of(path).unwrap_or_default(),
        });
    }

    let image = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| FileError::LowQuality {
            reason: format!("Could not open image: {e}"),
        })?
        .decode()
        .map_err(|e| FileError::LowQuality {
            reason: format!("Could not decode image: {e}"),
        })?;

    check_resolution(image.width(), image.height(), min_dimension)
        .map_err(|reason| FileError::LowQuality { reason })?;

    debug!(
        "Validated {} ({}×{})",
        path.display(),
        image.width(),
        image.height()
    );

    Ok(ValidatedImage {
        path: path.to_path_buf(),
        image,
    })
}

/// Async wrapper around [`inspect_image`]; decoding runs in `spawn_blocking`.
pub async fn validate(path: &Path, min_dimension: u32) -> Result<ValidatedImage, FileError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || inspect_image(&owned, min_dimension))
        .await
        .map_err(|e| FileError::Internal {
            detail: format!("Image decode task panicked: {e}"),
        })?
}
