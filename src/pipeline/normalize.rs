//! Image normalisation: arbitrary source image → bounded JPEG ready for upload.
//!
//! The longest edge is scaled down to the profile's `max_dimension` with a
//! uniform factor; images already inside the bound keep their size. The
//! result is always JPEG, which has no alpha channel, so transparent pixels
//! are flattened by dropping alpha.

use crate::config::ImageProfile;
use crate::error::StorefrontError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// An encoded, size-bounded image.
#[derive(Clone, PartialEq)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for NormalizedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedImage")
            .field("bytes", &self.bytes.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Decode `source`, bound it to `profile`, and re-encode as JPEG.
///
/// CPU-bound; async callers should run it under `spawn_blocking`.
pub fn normalize(source: &[u8], profile: ImageProfile) -> Result<NormalizedImage, StorefrontError> {
    let img = image::load_from_memory(source)
        .map_err(|e| StorefrontError::Encoding(format!("cannot decode source image: {e}")))?;
    normalize_image(&img, profile)
}

/// Same as [`normalize`] for an already-decoded image.
pub fn normalize_image(
    img: &DynamicImage,
    profile: ImageProfile,
) -> Result<NormalizedImage, StorefrontError> {
    let (src_w, src_h) = (img.width(), img.height());
    if src_w == 0 || src_h == 0 {
        return Err(StorefrontError::Encoding("source image has no pixels".into()));
    }

    let (width, height) = scaled_dimensions(src_w, src_h, profile.max_dimension);
    let resized = if (width, height) == (src_w, src_h) {
        img.to_rgb8()
    } else {
        img.resize_exact(width, height, FilterType::Triangle).to_rgb8()
    };

    let bytes = encode_jpeg(&DynamicImage::ImageRgb8(resized), profile.quality)?;
    debug!(
        "Normalised {}x{} → {}x{} ({} bytes)",
        src_w,
        src_h,
        width,
        height,
        bytes.len()
    );

    Ok(NormalizedImage {
        bytes,
        width,
        height,
    })
}

/// Target size for a `width × height` image bounded by `max_dimension`.
///
/// The scale factor is `min(1, max_dimension / max(width, height))`, applied to
/// both axes and rounded, never below one pixel.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }
    let scale = f64::from(max_dimension) / f64::from(longest);
    let w = (f64::from(width) * scale).round().max(1.0) as u32;
    let h = (f64::from(height) * scale).round().max(1.0) as u32;
    (w.min(max_dimension), h.min(max_dimension))
}

/// JPEG-encode at a fractional quality in `(0, 1]`.
pub fn encode_jpeg(img: &DynamicImage, quality: f32) -> Result<Vec<u8>, StorefrontError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buf), jpeg_quality(quality));
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| StorefrontError::Encoding(format!("JPEG encoding failed: {e}")))?;
    Ok(buf)
}

/// Map a `(0, 1]` fraction onto the encoder's 1–100 scale.
fn jpeg_quality(fraction: f32) -> u8 {
    (fraction * 100.0).round().clamp(1.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([200, 30, 30, 255]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn scale_caps_longest_edge() {
        assert_eq!(scaled_dimensions(1600, 1200, 800), (800, 600));
        assert_eq!(scaled_dimensions(1200, 1600, 800), (600, 800));
        assert_eq!(scaled_dimensions(3000, 10, 800), (800, 3));
        assert_eq!(scaled_dimensions(10_000, 1, 400), (400, 1));
    }

    #[test]
    fn small_images_are_not_upscaled() {
        assert_eq!(scaled_dimensions(640, 480, 800), (640, 480));
        assert_eq!(scaled_dimensions(800, 800, 800), (800, 800));
    }

    #[test]
    fn quality_mapping() {
        assert_eq!(jpeg_quality(0.7), 70);
        assert_eq!(jpeg_quality(0.8), 80);
        assert_eq!(jpeg_quality(1.0), 100);
        assert_eq!(jpeg_quality(0.001), 1);
    }

    #[test]
    fn oversize_image_is_bounded_and_jpeg() {
        let out = normalize(&png(1000, 500), ImageProfile::PRODUCT).unwrap();
        assert_eq!((out.width, out.height), (800, 400));
        assert_eq!(
            image::guess_format(&out.bytes).unwrap(),
            ImageFormat::Jpeg
        );
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 400));
    }

    #[test]
    fn in_bound_image_keeps_dimensions() {
        let out = normalize(&png(120, 90), ImageProfile::LOGO).unwrap();
        assert_eq!((out.width, out.height), (120, 90));
    }

    #[test]
    fn garbage_is_encoding_error() {
        let err = normalize(b"definitely not an image", ImageProfile::PRODUCT).unwrap_err();
        assert!(matches!(err, StorefrontError::Encoding(_)));
    }
}
