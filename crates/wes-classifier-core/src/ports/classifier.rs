//! Inference port implemented by model backends.

use crate::domain::{InputTensor, ProbabilityVector};
use crate::error::InferenceError;

/// A loaded model that maps one input tensor to one score per label.
///
/// Callers must not assume a handle is reentrant: the pipeline serializes
/// calls to `infer` even when `Self: Sync`.
pub trait Classifier: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Runs a single forward pass with batch size 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or produces malformed output.
    fn infer(&self, input: &InputTensor) -> Result<ProbabilityVector, InferenceError>;
}

impl<T: Classifier + ?Sized> Classifier for std::sync::Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn infer(&self, input: &InputTensor) -> Result<ProbabilityVector, InferenceError> {
        (**self).infer(input)
    }
}
