//! Decoding, JPEG compression and thumbnail derivation.
//!
//! Everything here is CPU bound and synchronous; the cache runs it on the
//! blocking pool.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat};

use crate::error::{CacheError, Result};

/// Decode `bytes`, detecting the format from the content.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// Decode `bytes` as the format implied by `path`'s extension.
pub fn decode_as_extension(bytes: &[u8], path: &Path) -> Result<DynamicImage> {
    let format = ImageFormat::from_path(path)?;
    Ok(image::load_from_memory_with_format(bytes, format)?)
}

/// Compress `image` as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder
        .encode(rgb.as_raw(), width, height, ColorType::Rgb8.into())
        .map_err(|e| CacheError::Encode(format!("Failed to encode JPEG: {e}")))?;

    Ok(out)
}

/// Largest size with `width:height`'s aspect ratio that fits in `bounds`.
///
/// Smaller images are scaled up to touch the box. Returns `None` when the
/// result would have a zero dimension.
pub fn fit_within(width: u32, height: u32, bounds: (u32, u32)) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }

    let ratio = (bounds.0 as f64 / width as f64).min(bounds.1 as f64 / height as f64);
    let fitted_w = (width as f64 * ratio).round() as u32;
    let fitted_h = (height as f64 * ratio).round() as u32;

    if fitted_w == 0 || fitted_h == 0 {
        return None;
    }
    Some((fitted_w, fitted_h))
}

/// Resize `image` to fit `bounds`, preserving its aspect ratio.
pub fn thumbnail(image: &DynamicImage, bounds: (u32, u32)) -> Result<DynamicImage> {
    let (width, height) = image.dimensions();
    let (target_w, target_h) = fit_within(width, height, bounds).ok_or_else(|| {
        CacheError::Thumbnail(format!(
            "{width}x{height} does not fit a {}x{} box",
            bounds.0, bounds.1
        ))
    })?;

    Ok(image.resize_exact(target_w, target_h, FilterType::Triangle))
}

#[cfg(test)]
mod tests {
    use image::{ImageBuffer, Rgb};

    use super::*;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn test_fit_within_preserves_aspect() {
        assert_eq!(fit_within(300, 150, (150, 150)), Some((150, 75)));
        assert_eq!(fit_within(100, 400, (150, 150)), Some((38, 150)));
        // small images scale up
        assert_eq!(fit_within(10, 10, (150, 150)), Some((150, 150)));
    }

    #[test]
    fn test_fit_within_zero_sized() {
        assert_eq!(fit_within(100, 100, (0, 0)), None);
        assert_eq!(fit_within(100, 100, (150, 0)), None);
        assert_eq!(fit_within(0, 100, (150, 150)), None);
        // extreme aspect ratio rounds a side down to nothing
        assert_eq!(fit_within(10_000, 1, (150, 150)), None);
    }

    #[test]
    fn test_jpeg_round_trip_keeps_dimensions() {
        let source = gradient(64, 32);
        let jpeg = encode_jpeg(&source, 70).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let decoded = decode(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (64, 32));
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let source = gradient(128, 128);
        let low = encode_jpeg(&source, 10).unwrap();
        let high = encode_jpeg(&source, 95).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_thumbnail_dimensions() {
        let thumb = thumbnail(&gradient(300, 200), (150, 150)).unwrap();
        assert_eq!(thumb.dimensions(), (150, 100));
        assert!(thumbnail(&gradient(300, 200), (0, 0)).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(b"not an image").is_err());
    }

    #[test]
    fn test_decode_as_extension_requires_matching_format() {
        let jpeg = encode_jpeg(&gradient(8, 8), 80).unwrap();
        assert!(decode_as_extension(&jpeg, Path::new("a.jpg")).is_ok());
        assert!(decode_as_extension(&jpeg, Path::new("a.png")).is_err());
        assert!(decode_as_extension(&jpeg, Path::new("no_extension")).is_err());
    }
}
