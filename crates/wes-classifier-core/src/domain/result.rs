//! Per-image outcomes and batch reports.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ImageId;

/// Image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageDimensions {
    /// Creates new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Winning label of one forward pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Position of the label in the label set.
    pub index: usize,
    /// Winning label.
    pub label: String,
    /// Score of the winning label times 100.
    pub confidence: f32,
}

impl Classification {
    /// Confidence rounded to a whole percent for display.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn confidence_rounded(&self) -> u32 {
        self.confidence.round().max(0.0) as u32
    }
}

/// Pipeline stage at which an image failed.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// The image could not be read from its source.
    Acquire,
    /// Decoding or resizing failed.
    Decode,
    /// The forward pass failed.
    Inference,
    /// The output could not be mapped to a label.
    Decision,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Acquire => "acquire",
            Self::Decode => "decode",
            Self::Inference => "inference",
            Self::Decision => "decision",
        })
    }
}

/// Outcome of running one image through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageStatus {
    /// The image was classified.
    Classified {
        /// Winning label and confidence.
        #[serde(flatten)]
        classification: Classification,
        /// Whether the acceptance policy surfaced this image.
        accepted: bool,
    },
    /// The image was skipped.
    Failed {
        /// Stage that failed.
        stage: FailureStage,
        /// Error chain rendered as text.
        error: String,
    },
}

/// Report for a single image of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReport {
    /// Batch-unique identifier.
    pub id: ImageId,
    /// Source path of the image.
    pub path: String,
    /// Time the report was produced (RFC 3339).
    pub timestamp: String,
    /// Decoded dimensions, when decoding succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<ImageDimensions>,
    /// Classification or failure.
    #[serde(flatten)]
    pub status: ImageStatus,
}

impl ImageReport {
    /// Returns the classification if the image was classified.
    #[must_use]
    pub const fn classification(&self) -> Option<&Classification> {
        match &self.status {
            ImageStatus::Classified { classification, .. } => Some(classification),
            ImageStatus::Failed { .. } => None,
        }
    }

    /// True if the acceptance policy surfaced this image.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self.status, ImageStatus::Classified { accepted: true, .. })
    }

    /// True if the image was skipped.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.status, ImageStatus::Failed { .. })
    }
}

/// An accepted image, as surfaced to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Batch-unique identifier of the source image.
    pub id: ImageId,
    /// Source path of the image.
    pub path: String,
    /// Winning label.
    pub label: String,
    /// Confidence in percent.
    pub confidence: f32,
}

impl ClassificationResult {
    fn from_report(report: &ImageReport) -> Option<Self> {
        match &report.status {
            ImageStatus::Classified {
                classification,
                accepted: true,
            } => Some(Self {
                id: report.id,
                path: report.path.clone(),
                label: classification.label.clone(),
                confidence: classification.confidence,
            }),
            _ => None,
        }
    }
}

/// All reports of a batch, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// One report per submitted image.
    pub reports: Vec<ImageReport>,
}

impl BatchReport {
    /// Accepted images in submission order.
    #[must_use]
    pub fn matches(&self) -> Vec<ClassificationResult> {
        self.reports
            .iter()
            .filter_map(ClassificationResult::from_report)
            .collect()
    }

    /// Number of images that were classified.
    #[must_use]
    pub fn classified(&self) -> usize {
        self.reports.iter().filter(|r| !r.is_failed()).count()
    }

    /// Number of images that were skipped.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failed()).count()
    }

    /// Number of accepted images.
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.reports.iter().filter(|r| r.is_accepted()).count()
    }
}

/// Current UTC time as RFC 3339.
#[must_use]
pub fn iso_timestamp() -> String {
    match time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339) {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Timestamp format failed: {e}");
            String::from("1970-01-01T00:00:00Z")
        }
    }
}
