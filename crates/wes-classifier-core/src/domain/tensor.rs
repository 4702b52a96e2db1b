//! Model input and output buffers.

use crate::error::PreprocessError;

/// Side length of the square model input, in pixels.
pub const INPUT_SIZE: usize = 224;

/// Number of colour channels in the model input.
pub const CHANNELS: usize = 3;

/// Total number of values in one input tensor.
pub const INPUT_LEN: usize = INPUT_SIZE * INPUT_SIZE * CHANNELS;

/// A normalized `224x224x3` image in row-major HWC order, values in `[0, 1]`.
///
/// Owned per image and dropped after the forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Vec<f32>,
}

impl InputTensor {
    /// Shape bound into the model input slot: `(batch, height, width, channels)`.
    pub const SHAPE: [usize; 4] = [1, INPUT_SIZE, INPUT_SIZE, CHANNELS];

    /// Wraps a buffer of exactly [`INPUT_LEN`] values.
    ///
    /// # Errors
    ///
    /// Returns [`PreprocessError::Layout`] if the buffer has the wrong length.
    pub fn from_vec(data: Vec<f32>) -> Result<Self, PreprocessError> {
        if data.len() == INPUT_LEN {
            Ok(Self { data })
        } else {
            Err(PreprocessError::Layout {
                expected: INPUT_LEN,
                actual: data.len(),
            })
        }
    }

    /// Raw values.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Channel values `[r, g, b]` at pixel `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> [f32; 3] {
        let i = (y * INPUT_SIZE + x) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

/// One score per label, as produced by a single forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityVector(Vec<f32>);

impl ProbabilityVector {
    /// Wraps raw scores.
    #[must_use]
    pub const fn new(scores: Vec<f32>) -> Self {
        Self(scores)
    }

    /// Number of scores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no scores.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Scores in label order.
    #[must_use]
    pub fn scores(&self) -> &[f32] {
        &self.0
    }

    /// Index and value of the highest score; the first maximum wins ties.
    ///
    /// NaN scores never win against a real number.
    #[must_use]
    pub fn argmax(&self) -> Option<(usize, f32)> {
        let mut iter = self.0.iter().copied().enumerate();
        let first = iter.next()?;
        Some(iter.fold(first, |best, (i, score)| {
            if score > best.1 || (best.1.is_nan() && !score.is_nan()) {
                (i, score)
            } else {
                best
            }
        }))
    }
}

impl From<Vec<f32>> for ProbabilityVector {
    fn from(scores: Vec<f32>) -> Self {
        Self::new(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_tensor_rejects_wrong_length() {
        let err = InputTensor::from_vec(vec![0.0; 10]);
        assert!(matches!(
            err,
            Err(PreprocessError::Layout {
                expected: INPUT_LEN,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_input_tensor_pixel_indexing() {
        let mut data = vec![0.0; INPUT_LEN];
        // pixel (x=2, y=1)
        let i = (INPUT_SIZE + 2) * CHANNELS;
        data[i] = 0.1;
        data[i + 1] = 0.2;
        data[i + 2] = 0.3;

        let tensor = InputTensor::from_vec(data).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(tensor.pixel(2, 1), [0.1, 0.2, 0.3]);
        assert_eq!(tensor.pixel(1, 2), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_argmax_first_maximum_wins() {
        let probs = ProbabilityVector::new(vec![0.2, 0.4, 0.4, 0.0]);
        assert_eq!(probs.argmax(), Some((1, 0.4)));
    }

    #[test]
    fn test_argmax_skips_nan() {
        let probs = ProbabilityVector::new(vec![f32::NAN, 0.3, f32::NAN, 0.1]);
        assert_eq!(probs.argmax(), Some((1, 0.3)));
    }

    #[test]
    fn test_argmax_empty() {
        assert_eq!(ProbabilityVector::new(vec![]).argmax(), None);
    }
}
