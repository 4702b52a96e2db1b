//! Error types for the classification pipeline.
//!
//! Load errors are fatal to a session. Acquire, preprocess, inference and
//! decision errors are scoped to a single image and never abort a batch.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::ImageId;

/// Boxed error used to carry backend-specific causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while loading the model and its label list.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The model artifact does not exist.
    #[error("model not found: {}", path.display())]
    ModelNotFound {
        /// Resolved artifact path.
        path: PathBuf,
    },

    /// The model artifact exists but could not be parsed or is missing weights.
    #[error("model is corrupt: {}", path.display())]
    ModelCorrupt {
        /// Resolved artifact path.
        path: PathBuf,
        /// Underlying parse or shape error.
        #[source]
        source: BoxError,
    },

    /// The label list is missing or contains no labels.
    #[error("invalid label list {}: {reason}", path.display())]
    LabelsInvalid {
        /// Resolved label resource path.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
}

/// Errors raised while turning a raw image into an input tensor.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// The image bytes could not be decoded.
    #[error("failed to decode image")]
    Decode(#[from] image::ImageError),

    /// The decoded image has no pixels.
    #[error("image has zero dimensions ({width}x{height})")]
    EmptyImage {
        /// Decoded width.
        width: u32,
        /// Decoded height.
        height: u32,
    },

    /// A tensor buffer did not match the fixed input layout.
    #[error("tensor buffer holds {actual} values, expected {expected}")]
    Layout {
        /// Required number of values.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
}

/// An image that could not be read from its source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to read {path}: {reason}")]
pub struct AcquireError {
    /// Identifier the image would have carried.
    pub id: ImageId,
    /// Where the source tried to read it from.
    pub path: String,
    /// Underlying cause, rendered as text.
    pub reason: String,
}

impl AcquireError {
    /// Creates an acquire error from any underlying cause.
    #[must_use]
    pub fn new(id: ImageId, path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            id,
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised by a forward pass.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The inference backend failed.
    #[error("inference backend failed")]
    Backend(#[source] BoxError),

    /// The model produced an output vector of the wrong length.
    #[error("model produced {actual} scores, expected {expected}")]
    OutputLength {
        /// Expected number of scores.
        expected: usize,
        /// Number of scores produced.
        actual: usize,
    },
}

impl From<candle_core::Error> for InferenceError {
    fn from(err: candle_core::Error) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Errors raised when mapping a probability vector to a label.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecisionError {
    /// Label count and score count disagree.
    #[error("label set has {labels} entries but the model produced {scores} scores")]
    LengthMismatch {
        /// Number of labels.
        labels: usize,
        /// Number of scores.
        scores: usize,
    },

    /// The probability vector is empty.
    #[error("probability vector is empty")]
    Empty,
}
