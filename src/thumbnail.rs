//! Aspect-preserving thumbnail rendering
//!
//! Thumbnails are scaled to fit inside the requested bounds and serialized
//! as JPEG at the requested quality.

use std::io::{Cursor, Write};

use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, DynamicImage};

use crate::cache::quality_percent;
use crate::error::LibraryError;

/// Scale a raster to fit `max_width` x `max_height`, preserving aspect ratio
///
/// `scale = min(max_width/src_width, max_height/src_height)`; both output
/// dimensions are the rounded scaled source dimensions, so the result never
/// exceeds the bounds and may undershoot one of them.
pub fn scale_to_fit(image: &DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let src_width = image.width();
    let src_height = image.height();
    if src_width == 0 || src_height == 0 {
        return image.clone();
    }

    let scale = (max_width as f64 / src_width as f64).min(max_height as f64 / src_height as f64);
    let dst_width = ((src_width as f64 * scale).round() as u32).max(1);
    let dst_height = ((src_height as f64 * scale).round() as u32).max(1);

    image.resize_exact(dst_width, dst_height, FilterType::Lanczos3)
}

/// Serialize a raster as JPEG at `quality` in `0.0..=1.0`
pub fn encode_jpeg(image: &DynamicImage, quality: f64) -> Result<Vec<u8>, LibraryError> {
    let mut buffer = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality_percent(quality));
    // JPEG has no alpha channel; flatten before encoding
    encoder
        .encode_image(&image.to_rgb8())
        .map_err(|e| LibraryError::ImageProcessing(format!("failed to encode thumbnail: {}", e)))?;
    Ok(buffer.into_inner())
}

/// Scale and serialize a raster into `out`
pub fn write_scaled_jpeg(
    image: &DynamicImage,
    max_width: u32,
    max_height: u32,
    quality: f64,
    out: &mut dyn Write,
) -> Result<(), LibraryError> {
    let scaled = scale_to_fit(image, max_width, max_height);
    let bytes = encode_jpeg(&scaled, quality)?;
    out.write_all(&bytes).map_err(LibraryError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([200, 60, 60]),
        ))
    }

    #[test]
    fn scaling_fits_bounds_and_keeps_aspect() {
        for (src_w, src_h, max_w, max_h) in [
            (4000u32, 3000u32, 256u32, 256u32),
            (3000, 4000, 256, 256),
            (1920, 1080, 300, 200),
            (100, 1000, 64, 64),
            (7, 5, 64, 64),
        ] {
            let scaled = scale_to_fit(&raster(src_w, src_h), max_w, max_h);
            assert!(scaled.width() <= max_w.max(1), "{}x{}", src_w, src_h);
            assert!(scaled.height() <= max_h.max(1), "{}x{}", src_w, src_h);

            let src_ratio = src_w as f64 / src_h as f64;
            let out_ratio = scaled.width() as f64 / scaled.height() as f64;
            // rounding to whole pixels bounds how far the ratio can drift
            let tolerance = src_ratio / scaled.height().min(scaled.width()) as f64;
            assert!(
                (src_ratio - out_ratio).abs() <= tolerance + f64::EPSILON,
                "aspect drift for {}x{} -> {}x{}",
                src_w,
                src_h,
                scaled.width(),
                scaled.height()
            );
        }
    }

    #[test]
    fn limiting_dimension_hits_the_bound() {
        let scaled = scale_to_fit(&raster(4000, 3000), 400, 400);
        assert_eq!(scaled.width(), 400);
        assert_eq!(scaled.height(), 300);
    }

    #[test]
    fn small_sources_scale_up_to_the_bound() {
        let scaled = scale_to_fit(&raster(10, 20), 100, 100);
        assert_eq!(scaled.width(), 50);
        assert_eq!(scaled.height(), 100);
    }

    #[test]
    fn encoded_jpeg_round_trips() {
        let bytes = encode_jpeg(&raster(40, 30), 0.8).unwrap();
        assert!(!bytes.is_empty());

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 40);
        assert_eq!(decoded.height(), 30);
    }

    #[test]
    fn write_scaled_jpeg_streams_to_writer() {
        let mut out = Vec::new();
        write_scaled_jpeg(&raster(640, 480), 64, 64, 0.7, &mut out).unwrap();

        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 48);
    }
}
