//! Preprocessing: normalise a validated image for OCR.
//!
//! Tesseract's own binarisation works on luminance, and colour screenshots
//! (syntax-highlighted PDFs, dark-mode viewers) recognise more reliably once
//! flattened to a single channel.

use image::{DynamicImage, GrayImage};
use std::io::Cursor;
use tracing::debug;

/// Convert to single-channel 8-bit luminance.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Encode a grayscale raster as PNG for engines that read files or stdin.
///
/// PNG is lossless; JPEG artefacts around glyph edges cost OCR accuracy.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded {}×{} raster → {} bytes PNG", image.width(), image.height(), buf.len());
    Ok(buf)
}
