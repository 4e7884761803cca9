//! ImageCompressor (C4): scales and re-encodes artwork until it fits under
//! [`MAX_COVER_ART_BYTES`].
//!
//! Re-encoding quality drops first (a cheap size win with no visible loss at
//! the high end), then the image is progressively downscaled if quality
//! alone isn't enough.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageError};

/// Invariant 5 (data model): "Cover art embedded in a written file is ≤2 MiB."
pub const MAX_COVER_ART_BYTES: usize = 2 * 1024 * 1024;

const QUALITY_STEPS: &[u8] = &[85, 75, 60, 45, 30];
const SCALE_STEPS: &[f32] = &[1.0, 0.75, 0.5, 0.35, 0.25];

#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] ImageError),
    #[error("failed to encode image: {0}")]
    Encode(#[source] ImageError),
    #[error("image could not be reduced below {0} bytes")]
    StillTooLarge(usize),
}

#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Compress `data` (any format `image` can decode) down to a JPEG no larger
/// than [`MAX_COVER_ART_BYTES`]. If `data` is already under the limit it is
/// returned unchanged (still re-tagged with its original `mime_type`).
pub fn compress(data: &[u8], mime_type: &str) -> Result<CompressedImage, CompressError> {
    if data.len() <= MAX_COVER_ART_BYTES {
        return Ok(CompressedImage { data: data.to_vec(), mime_type: mime_type.to_string() });
    }

    let image = image::load_from_memory(data).map_err(CompressError::Decode)?;

    for scale in SCALE_STEPS {
        let scaled = if (*scale - 1.0).abs() < f32::EPSILON {
            image.clone()
        } else {
            resize(&image, *scale)
        };

        for quality in QUALITY_STEPS {
            let encoded = encode_jpeg(&scaled, *quality)?;
            if encoded.len() <= MAX_COVER_ART_BYTES {
                return Ok(CompressedImage { data: encoded, mime_type: "image/jpeg".to_string() });
            }
        }
    }

    Err(CompressError::StillTooLarge(MAX_COVER_ART_BYTES))
}

fn resize(image: &DynamicImage, scale: f32) -> DynamicImage {
    let (w, h) = image.dimensions();
    let new_w = ((w as f32) * scale).max(1.0) as u32;
    let new_h = ((h as f32) * scale).max(1.0) as u32;
    image.resize(new_w, new_h, FilterType::Lanczos3)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CompressError> {
    let mut buf = Vec::new();
    let rgb = image.to_rgb8();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), image::ExtendedColorType::Rgb8)
        .map_err(CompressError::Encode)?;
    Ok(buf)
}
