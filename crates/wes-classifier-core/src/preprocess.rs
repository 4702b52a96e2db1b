//! Image preprocessing into the model input layout.
//!
//! Every image is converted to 8-bit RGB (alpha discarded), resized to
//! `224x224` with a bilinear filter, and scaled to `[0, 1]` by dividing by 255.
//! Values are laid out row-major with interleaved channels: `R, G, B` for
//! pixel `(0, 0)`, then pixel `(1, 0)`, and so on.

use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView};

use crate::domain::{ImageData, ImageDimensions, InputTensor, RawImage, INPUT_SIZE};
use crate::error::PreprocessError;

/// Resampling filter used for every resize.
pub const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Decodes a raw image, borrowing it when it is already a bitmap.
///
/// # Errors
///
/// Returns [`PreprocessError::Decode`] if the bytes are not a supported image.
pub fn decode(raw: &RawImage) -> Result<Cow<'_, DynamicImage>, PreprocessError> {
    match &raw.data {
        ImageData::Decoded(image) => Ok(Cow::Borrowed(image)),
        ImageData::Encoded(bytes) => Ok(Cow::Owned(image::load_from_memory(bytes)?)),
    }
}

/// Converts a decoded image into a normalized `224x224x3` input tensor.
///
/// Images that are already `224x224` are not resampled.
///
/// # Errors
///
/// Returns [`PreprocessError::EmptyImage`] if either dimension is zero.
#[allow(clippy::cast_possible_truncation)]
pub fn preprocess(image: &DynamicImage) -> Result<InputTensor, PreprocessError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PreprocessError::EmptyImage { width, height });
    }

    let size = INPUT_SIZE as u32;
    let rgb = image.to_rgb8();
    let rgb = if width == size && height == size {
        rgb
    } else {
        imageops::resize(&rgb, size, size, RESIZE_FILTER)
    };

    let data: Vec<f32> = rgb
        .as_raw()
        .iter()
        .map(|&v| f32::from(v) / 255.0)
        .collect();

    InputTensor::from_vec(data)
}

/// Decodes and preprocesses a raw image, returning its original dimensions too.
///
/// # Errors
///
/// Returns an error if decoding or preprocessing fails.
pub fn prepare(raw: &RawImage) -> Result<(ImageDimensions, InputTensor), PreprocessError> {
    let image = decode(raw)?;
    let (width, height) = image.dimensions();
    let tensor = preprocess(&image)?;
    Ok((ImageDimensions::new(width, height), tensor))
}
