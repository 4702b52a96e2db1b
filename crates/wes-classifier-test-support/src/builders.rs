//! Synthetic image builders for testing.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use wes_classifier_core::domain::{ImageId, RawImage};

/// Builder for creating synthetic test images.
///
/// Bitmaps come back as [`RawImage`]s ready for the pipeline, or as encoded
/// bytes and files for adapter and CLI tests.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    // === Bitmaps ===

    /// A single-colour RGB image.
    #[must_use]
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    /// Pastel pink, the kind of flat palette the classifier is trained on.
    #[must_use]
    pub fn pastel(width: u32, height: u32) -> DynamicImage {
        Self::solid(width, height, [244, 194, 194])
    }

    /// Red rises left to right, green top to bottom.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            Rgb([r, g, 128])
        }))
    }

    /// High-contrast grayscale checkerboard.
    #[must_use]
    pub fn checkerboard(width: u32, height: u32, cell_size: u32) -> DynamicImage {
        let cell = cell_size.max(1);
        DynamicImage::ImageLuma8(image::GrayImage::from_fn(width, height, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        }))
    }

    /// RGBA image with a fully transparent alpha channel.
    #[must_use]
    pub fn transparent(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        let [r, g, b] = rgb;
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([r, g, b, 0])))
    }

    // === Raw images ===

    /// Wraps a bitmap as a decoded raw image named `synthetic://<id>`.
    #[must_use]
    pub fn raw(id: usize, image: DynamicImage) -> RawImage {
        RawImage::decoded(ImageId(id), format!("synthetic://{id}"), image)
    }

    /// A batch of `count` decoded pastel images with ids `0..count`.
    #[must_use]
    pub fn batch(count: usize) -> Vec<RawImage> {
        (0..count).map(|i| Self::raw(i, Self::pastel(64, 48))).collect()
    }

    /// A raw image whose bytes are not any image format.
    #[must_use]
    pub fn corrupt(id: usize) -> RawImage {
        RawImage::encoded(ImageId(id), format!("corrupt://{id}"), Self::corrupt_bytes())
    }

    // === Encoded bytes and files ===

    /// PNG-encodes a bitmap.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails, which does not happen for in-memory buffers.
    #[must_use]
    pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        Self::encode(image, ImageFormat::Png)
    }

    /// JPEG-encodes a bitmap (RGB only).
    ///
    /// # Panics
    ///
    /// Panics if encoding fails.
    #[must_use]
    pub fn jpeg_bytes(image: &DynamicImage) -> Vec<u8> {
        Self::encode(&DynamicImage::ImageRgb8(image.to_rgb8()), ImageFormat::Jpeg)
    }

    fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap_or_else(|e| panic!("encoding {format:?} failed: {e}"));
        bytes
    }

    /// Bytes with an image extension's worth of garbage.
    #[must_use]
    pub fn corrupt_bytes() -> Vec<u8> {
        b"\xFF\xD8 this is not really a JPEG".to_vec()
    }

    /// Writes a bitmap to `path` in the format implied by its extension.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write(path: &Path, image: &DynamicImage) {
        let bytes = match path.extension().and_then(|e| e.to_str()) {
            Some("jpg" | "jpeg") => Self::jpeg_bytes(image),
            _ => Self::png_bytes(image),
        };
        std::fs::write(path, bytes)
            .unwrap_or_else(|e| panic!("writing {} failed: {e}", path.display()));
    }

    /// Writes garbage bytes to `path`.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_corrupt(path: &Path) {
        std::fs::write(path, Self::corrupt_bytes())
            .unwrap_or_else(|e| panic!("writing {} failed: {e}", path.display()));
    }
}
