//! Raw images handed to the pipeline by an image source.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AcquireError;

/// Identifier of an image, unique within its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub usize);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Pixel payload of a raw image.
#[derive(Debug, Clone)]
pub enum ImageData {
    /// Encoded file contents (JPEG, PNG, ...), decoded by the preprocessor.
    Encoded(Vec<u8>),
    /// An already decoded bitmap.
    Decoded(image::DynamicImage),
}

/// An image as acquired from its source, read-only to the pipeline.
#[derive(Debug, Clone)]
pub struct RawImage {
    /// Batch-unique identifier.
    pub id: ImageId,
    /// Where the image came from (file path or synthetic name).
    pub path: String,
    /// Pixel payload.
    pub data: ImageData,
}

impl RawImage {
    /// Creates a raw image from encoded file bytes.
    #[must_use]
    pub fn encoded(id: ImageId, path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id,
            path: path.into(),
            data: ImageData::Encoded(bytes),
        }
    }

    /// Creates a raw image from a decoded bitmap.
    #[must_use]
    pub fn decoded(id: ImageId, path: impl Into<String>, image: image::DynamicImage) -> Self {
        Self {
            id,
            path: path.into(),
            data: ImageData::Decoded(image),
        }
    }

    /// Returns a copy carrying a different identifier.
    #[must_use]
    pub fn with_id(mut self, id: ImageId) -> Self {
        self.id = id;
        self
    }
}

/// One item handed to the pipeline: an image, or the reason it is missing.
#[derive(Debug, Clone)]
pub enum Acquired {
    /// The image was read.
    Image(RawImage),
    /// The source could not read the image.
    Failed(AcquireError),
}

impl Acquired {
    /// Batch identifier of the item.
    #[must_use]
    pub const fn id(&self) -> ImageId {
        match self {
            Self::Image(raw) => raw.id,
            Self::Failed(err) => err.id,
        }
    }

    /// Source path of the item.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Image(raw) => &raw.path,
            Self::Failed(err) => &err.path,
        }
    }
}

impl From<RawImage> for Acquired {
    fn from(raw: RawImage) -> Self {
        Self::Image(raw)
    }
}

impl From<Result<RawImage, AcquireError>> for Acquired {
    fn from(item: Result<RawImage, AcquireError>) -> Self {
        match item {
            Ok(raw) => Self::Image(raw),
            Err(err) => Self::Failed(err),
        }
    }
}
