//! Core domain types for image classification.

mod labels;
mod raw;
mod result;
mod tensor;

pub use labels::{LabelSet, WES_ANDERSON};
pub use raw::{Acquired, ImageData, ImageId, RawImage};
pub use result::{
    iso_timestamp, BatchReport, Classification, ClassificationResult, FailureStage,
    ImageDimensions, ImageReport, ImageStatus,
};
pub use tensor::{InputTensor, ProbabilityVector, CHANNELS, INPUT_LEN, INPUT_SIZE};
