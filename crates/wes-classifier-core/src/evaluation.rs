//! Accuracy metrics over a labeled image set.

use serde::Serialize;

use crate::domain::{ImageReport, LabelSet};

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    /// Class name.
    pub label: String,
    /// Share of images predicted as this class that really are, 0 if none.
    pub precision: f64,
    /// Share of this class's images predicted as it, 0 if none.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Number of images whose true class is this one.
    pub support: usize,
    /// Number of those images predicted correctly.
    pub correct: usize,
    /// `correct / support`, absent when the class has no images.
    pub accuracy: Option<f64>,
}

/// Confusion matrix over `(actual, predicted)` label indices.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    labels: LabelSet,
    matrix: Vec<Vec<usize>>,
    failed: usize,
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl Evaluation {
    /// Creates an empty evaluation for the given classes.
    #[must_use]
    pub fn new(labels: LabelSet) -> Self {
        let n = labels.len();
        Self {
            labels,
            matrix: vec![vec![0; n]; n],
            failed: 0,
        }
    }

    /// Records one prediction. Out-of-range indices count as failures.
    pub fn record(&mut self, actual: usize, predicted: usize) {
        match self
            .matrix
            .get_mut(actual)
            .and_then(|row| row.get_mut(predicted))
        {
            Some(cell) => *cell += 1,
            None => self.failed += 1,
        }
    }

    /// Records the outcome of classifying an image whose true class is `actual`.
    pub fn record_report(&mut self, actual: usize, report: &ImageReport) {
        match report.classification() {
            Some(classification) => self.record(actual, classification.index),
            None => self.record_failure(),
        }
    }

    /// Counts an image that could not be classified.
    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    #[must_use]
    pub const fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Raw counts; rows are actual classes, columns predicted classes.
    #[must_use]
    pub fn confusion_matrix(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Each row divided by its sum, in percent. Empty rows stay zero.
    #[must_use]
    pub fn normalized_matrix(&self) -> Vec<Vec<f64>> {
        self.matrix
            .iter()
            .map(|row| {
                let total: usize = row.iter().sum();
                row.iter().map(|&c| ratio(c, total) * 100.0).collect()
            })
            .collect()
    }

    /// Images included in the matrix.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Images that failed before a prediction was made.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.failed
    }

    /// Correct predictions.
    #[must_use]
    pub fn correct(&self) -> usize {
        (0..self.matrix.len()).map(|i| self.matrix[i][i]).sum()
    }

    /// Fraction of correct predictions, 0 when nothing was recorded.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// `1 - accuracy`, 0 when nothing was recorded.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            1.0 - self.accuracy()
        }
    }

    /// Per-class metrics in label order.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let correct = self.matrix[i][i];
                let support: usize = self.matrix[i].iter().sum();
                let predicted: usize = self.matrix.iter().map(|row| row[i]).sum();

                let precision = ratio(correct, predicted);
                let recall = ratio(correct, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };

                ClassMetrics {
                    label: label.to_string(),
                    precision,
                    recall,
                    f1,
                    support,
                    correct,
                    accuracy: (support > 0).then(|| ratio(correct, support)),
                }
            })
            .collect()
    }

    /// Serializable snapshot of every metric.
    #[must_use]
    pub fn summary(&self) -> EvaluationSummary {
        EvaluationSummary {
            total: self.total(),
            failed: self.failed,
            accuracy: self.accuracy(),
            error_rate: self.error_rate(),
            classes: self.class_metrics(),
            confusion_matrix: self.matrix.clone(),
            normalized_matrix: self.normalized_matrix(),
        }
    }
}

/// Flattened evaluation result for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    /// Images that received a prediction.
    pub total: usize,
    /// Images that could not be read, decoded or classified.
    pub failed: usize,
    /// Fraction of predictions that were correct.
    pub accuracy: f64,
    /// `1 - accuracy`, 0 when nothing was predicted.
    pub error_rate: f64,
    /// Per-class metrics in label order.
    pub classes: Vec<ClassMetrics>,
    /// Raw counts; rows are actual classes, columns predicted classes.
    pub confusion_matrix: Vec<Vec<usize>>,
    /// Each row of the confusion matrix in percent of its row total.
    pub normalized_matrix: Vec<Vec<f64>>,
}
