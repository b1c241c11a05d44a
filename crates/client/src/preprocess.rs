//! Image pre-processing before upload.
//!
//! Images are decoded, downscaled to fit [`ImageLimits`] while keeping the
//! aspect ratio, and re-encoded as JPEG. Quality starts at 90 and drops by
//! 10 until the output fits `max_bytes` or quality reaches 10.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageError, ImageReader, codecs::jpeg::JpegEncoder, imageops::FilterType};
use thiserror::Error;

use crate::api::ImageUpload;

const INITIAL_QUALITY: u8 = 90;
const QUALITY_STEP: u8 = 10;
const MIN_QUALITY: u8 = 10;

/// Errors from [`preprocess_image`].
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// Format could not be sniffed.
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),

    /// Decoding or encoding failed.
    #[error("failed to process image: {0}")]
    Image(#[from] ImageError),
}

/// Bounds an upload must fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub max_bytes: usize,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1920,
            max_bytes: 2 * 1024 * 1024,
        }
    }
}

/// A re-encoded JPEG ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub original_size: usize,
    pub new_size: usize,
    /// JPEG quality of the final encode.
    pub quality: u8,
}

impl ProcessedImage {
    pub const CONTENT_TYPE: &'static str = "image/jpeg";

    #[must_use]
    pub fn into_upload(self) -> ImageUpload {
        ImageUpload {
            bytes: self.bytes,
            filename: self.filename,
            content_type: Self::CONTENT_TYPE.to_string(),
        }
    }
}

/// Downscale and recompress `bytes` to fit `limits`.
///
/// The result may still exceed `max_bytes` when even the lowest quality
/// is too large.
///
/// # Errors
///
/// Returns an error if the bytes are not a decodable image.
pub fn preprocess_image(
    bytes: &[u8],
    filename: &str,
    limits: ImageLimits,
) -> Result<ProcessedImage, PreprocessError> {
    let decoded = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;

    let (width, height) = fit_within(
        decoded.width(),
        decoded.height(),
        limits.max_width,
        limits.max_height,
    );
    let resized = if (width, height) == (decoded.width(), decoded.height()) {
        decoded
    } else {
        decoded.resize_exact(width, height, FilterType::Lanczos3)
    };

    // JPEG carries no alpha channel
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut quality = INITIAL_QUALITY;
    let mut encoded = encode_jpeg(&rgb, quality)?;
    while encoded.len() > limits.max_bytes && quality > MIN_QUALITY {
        quality -= QUALITY_STEP;
        encoded = encode_jpeg(&rgb, quality)?;
    }

    tracing::debug!(
        width,
        height,
        quality,
        original_size = bytes.len(),
        new_size = encoded.len(),
        "Pre-processed image"
    );

    Ok(ProcessedImage {
        new_size: encoded.len(),
        bytes: encoded,
        filename: jpeg_filename(filename),
        width,
        height,
        original_size: bytes.len(),
        quality,
    })
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut out = Vec::new();
    image.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
    Ok(out)
}

/// Largest size within the bounds that keeps the aspect ratio, rounding
/// down. Images already inside the bounds are left alone.
fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let (w, h) = (u64::from(width), u64::from(height));
    let (max_w, max_h) = (u64::from(max_width), u64::from(max_height));

    // Compare max_w / w against max_h / h without floats
    let (new_w, new_h) = if max_w * h <= max_h * w {
        (max_w, h * max_w / w)
    } else {
        (w * max_h / h, max_h)
    };

    (
        u32::try_from(new_w).unwrap_or(max_width).max(1),
        u32::try_from(new_h).unwrap_or(max_height).max(1),
    )
}

fn jpeg_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    format!("{stem}.jpg")
}
