//! Decision policy: pick the winning label and decide whether to surface it.

use crate::domain::{Classification, LabelSet, ProbabilityVector, WES_ANDERSON};
use crate::error::DecisionError;

/// Default minimum confidence, in percent, for an image to be surfaced.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 95.0;

/// Maps a probability vector to its winning label.
///
/// The highest score wins, the lowest index breaks ties, and the confidence
/// is the raw score times 100.
///
/// # Errors
///
/// Returns an error if the vector is empty or its length differs from the
/// label count.
pub fn decide(
    probabilities: &ProbabilityVector,
    labels: &LabelSet,
) -> Result<Classification, DecisionError> {
    if probabilities.len() != labels.len() {
        return Err(DecisionError::LengthMismatch {
            labels: labels.len(),
            scores: probabilities.len(),
        });
    }

    let (index, score) = probabilities.argmax().ok_or(DecisionError::Empty)?;
    let label = labels.get(index).ok_or(DecisionError::LengthMismatch {
        labels: labels.len(),
        scores: probabilities.len(),
    })?;

    Ok(Classification {
        index,
        label: label.to_string(),
        confidence: score * 100.0,
    })
}

/// Acceptance rule: which classifications are surfaced to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptancePolicy {
    /// Label that must win.
    pub target_label: String,
    /// Minimum confidence in percent (inclusive).
    pub min_confidence: f32,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            target_label: WES_ANDERSON.to_string(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl AcceptancePolicy {
    /// Creates a policy for `target_label` with the given threshold.
    #[must_use]
    pub fn new(target_label: impl Into<String>, min_confidence: f32) -> Self {
        Self {
            target_label: target_label.into(),
            min_confidence,
        }
    }

    /// True if the label matches and the confidence reaches the threshold.
    #[must_use]
    pub fn accepts(&self, classification: &Classification) -> bool {
        classification.label == self.target_label
            && classification.confidence >= self.min_confidence
    }
}
