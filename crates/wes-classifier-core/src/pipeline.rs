//! Batch classification session.
//!
//! A [`Session`] owns the loaded classifier, its label set and the acceptance
//! policy for the lifetime of a run. Batches are consumed in chunks: each
//! chunk is decoded and preprocessed in parallel on the session's thread
//! pool, then run through the classifier one image at a time in submission
//! order. A failing image, including one its source could not read, produces
//! a failed report and the batch moves on.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{
    iso_timestamp, Acquired, BatchReport, ClassificationResult, FailureStage, ImageDimensions, ImageReport,
    ImageStatus, InputTensor, LabelSet, ProbabilityVector, RawImage,
};
use crate::error::{AcquireError, InferenceError, PreprocessError};
use crate::policy::{decide, AcceptancePolicy};
use crate::ports::{Classifier, NoProgress, ProgressEvent, ProgressSink};
use crate::preprocess;

/// Default size of the preprocessing thread pool.
pub const DEFAULT_THREADS: usize = 4;

/// Session-scoped classification context.
pub struct Session {
    classifier: Box<dyn Classifier>,
    labels: LabelSet,
    policy: AcceptancePolicy,
    pool: rayon::ThreadPool,
    infer_lock: Mutex<()>,
}

impl Session {
    /// Creates a session around a loaded classifier.
    ///
    /// `threads` sizes the preprocessing pool; zero is treated as one.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread pool cannot be created.
    pub fn new(
        classifier: Box<dyn Classifier>,
        labels: LabelSet,
        policy: AcceptancePolicy,
        threads: usize,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("wes-preprocess-{i}"))
            .build()
            .context("Failed to create preprocessing thread pool")?;

        info!(
            "Session ready: backend={}, labels={}, target={}, min_confidence={:.2}%, threads={}",
            classifier.name(),
            labels.len(),
            policy.target_label,
            policy.min_confidence,
            pool.current_num_threads()
        );

        Ok(Self {
            classifier,
            labels,
            policy,
            pool,
            infer_lock: Mutex::new(()),
        })
    }

    /// Label set the classifier was loaded with.
    #[must_use]
    pub const fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Active acceptance policy.
    #[must_use]
    pub const fn policy(&self) -> &AcceptancePolicy {
        &self.policy
    }

    /// Number of preprocessing threads.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn chunk_size(&self) -> usize {
        self.threads() * 2
    }

    /// Classifies a single image on the calling thread.
    #[must_use]
    pub fn classify(&self, raw: &RawImage) -> ImageReport {
        self.finish(raw, preprocess::prepare(raw))
    }

    /// Lazily classifies `images`, yielding one report per image in order.
    ///
    /// Items may be raw images or acquire results; an image that could not
    /// be read becomes a failed report at its position.
    pub fn reports<'a, I>(
        &'a self,
        images: I,
        progress: &'a dyn ProgressSink,
    ) -> Reports<'a, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Into<Acquired>,
    {
        let images = images.into_iter();
        let (lower, upper) = images.size_hint();
        Reports {
            session: self,
            images,
            progress,
            ready: VecDeque::new(),
            next_index: 0,
            total: (Some(lower) == upper).then_some(lower),
        }
    }

    /// Classifies a whole batch and returns every per-image report.
    pub fn run_batch<I>(&self, images: I, progress: &dyn ProgressSink) -> BatchReport
    where
        I: IntoIterator,
        I::Item: Into<Acquired>,
    {
        let reports: Vec<ImageReport> = self.reports(images, progress).collect();
        let batch = BatchReport { reports };

        progress.on_event(ProgressEvent::Finished {
            classified: batch.classified(),
            failed: batch.failed(),
            matched: batch.accepted(),
        });

        batch
    }

    /// Classifies a batch and returns only the accepted images, in order.
    pub fn process_batch<I>(&self, images: I) -> Vec<ClassificationResult>
    where
        I: IntoIterator,
        I::Item: Into<Acquired>,
    {
        self.run_batch(images, &NoProgress).matches()
    }

    fn process_chunk(
        &self,
        chunk: &[Acquired],
        progress: &dyn ProgressSink,
        first_index: usize,
        total: Option<usize>,
    ) -> Vec<ImageReport> {
        let prepared: Vec<_> = self.pool.install(|| {
            chunk
                .par_iter()
                .map(|item| match item {
                    Acquired::Image(raw) => Some(preprocess::prepare(raw)),
                    Acquired::Failed(_) => None,
                })
                .collect()
        });

        chunk
            .iter()
            .zip(prepared)
            .enumerate()
            .map(|(offset, (item, prepared))| match item {
                Acquired::Image(raw) => {
                    progress.on_event(ProgressEvent::Started {
                        path: raw.path.clone(),
                        index: first_index + offset,
                        total,
                    });
                    let prepared = prepared.unwrap_or_else(|| preprocess::prepare(raw));
                    let report = self.finish(raw, prepared);
                    progress.on_event(ProgressEvent::Completed {
                        report: report.clone(),
                    });
                    report
                }
                Acquired::Failed(err) => {
                    progress.on_event(ProgressEvent::Skipped {
                        path: err.path.clone(),
                        reason: err.reason.clone(),
                    });
                    acquire_failed_report(err)
                }
            })
            .collect()
    }

    /// Runs inference and the decision policy on a preprocessed image.
    fn finish(
        &self,
        raw: &RawImage,
        prepared: Result<(ImageDimensions, InputTensor), PreprocessError>,
    ) -> ImageReport {
        let (dimensions, tensor) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return failed_report(raw, None, FailureStage::Decode, &e),
        };

        let probabilities = match self.infer(&tensor) {
            Ok(p) => p,
            Err(e) => return failed_report(raw, Some(dimensions), FailureStage::Inference, &e),
        };
        drop(tensor);

        let classification = match decide(&probabilities, &self.labels) {
            Ok(c) => c,
            Err(e) => return failed_report(raw, Some(dimensions), FailureStage::Decision, &e),
        };

        let accepted = self.policy.accepts(&classification);
        debug!(
            "{} {}: {} ({:.2}%), accepted={}",
            raw.id, raw.path, classification.label, classification.confidence, accepted
        );

        ImageReport {
            id: raw.id,
            path: raw.path.clone(),
            timestamp: iso_timestamp(),
            dimensions: Some(dimensions),
            status: ImageStatus::Classified {
                classification,
                accepted,
            },
        }
    }

    fn infer(&self, tensor: &InputTensor) -> Result<ProbabilityVector, InferenceError> {
        let _guard = self
            .infer_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.classifier.infer(tensor)
    }
}

/// Lazy iterator over the reports of a batch, see [`Session::reports`].
pub struct Reports<'a, I> {
    session: &'a Session,
    images: I,
    progress: &'a dyn ProgressSink,
    ready: VecDeque<ImageReport>,
    next_index: usize,
    total: Option<usize>,
}

impl<I> Iterator for Reports<'_, I>
where
    I: Iterator,
    I::Item: Into<Acquired>,
{
    type Item = ImageReport;

    fn next(&mut self) -> Option<ImageReport> {
        if let Some(report) = self.ready.pop_front() {
            return Some(report);
        }

        let chunk: Vec<Acquired> = self
            .images
            .by_ref()
            .take(self.session.chunk_size())
            .map(Into::into)
            .collect();
        if chunk.is_empty() {
            return None;
        }

        let reports = self
            .session
            .process_chunk(&chunk, self.progress, self.next_index, self.total);
        self.next_index += chunk.len();
        self.ready = reports.into();
        self.ready.pop_front()
    }
}

fn failed_report(
    raw: &RawImage,
    dimensions: Option<ImageDimensions>,
    stage: FailureStage,
    err: &dyn std::error::Error,
) -> ImageReport {
    let error = error_chain(err);
    warn!("Skipping {} {}: {error}", raw.id, raw.path);

    ImageReport {
        id: raw.id,
        path: raw.path.clone(),
        timestamp: iso_timestamp(),
        dimensions,
        status: ImageStatus::Failed { stage, error },
    }
}

fn acquire_failed_report(err: &AcquireError) -> ImageReport {
    warn!("Skipping {} {}: {}", err.id, err.path, err.reason);

    ImageReport {
        id: err.id,
        path: err.path.clone(),
        timestamp: iso_timestamp(),
        dimensions: None,
        status: ImageStatus::Failed {
            stage: FailureStage::Acquire,
            error: err.reason.clone(),
        },
    }
}

/// Renders an error and its sources as `outer: inner: root`.
#[must_use]
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ImageId, INPUT_LEN};
    use crate::error::DecisionError;

    /// Returns a fixed vector regardless of input.
    struct Fixed(Vec<f32>);

    impl Classifier for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn infer(&self, input: &InputTensor) -> Result<ProbabilityVector, InferenceError> {
            assert_eq!(input.as_slice().len(), INPUT_LEN);
            Ok(ProbabilityVector::new(self.0.clone()))
        }
    }

    fn session(scores: Vec<f32>) -> Session {
        let labels = LabelSet::new(["WES_ANDERSON", "NOT_WES_ANDERSON", "OTHER"])
            .unwrap_or_else(|| panic!("labels"));
        Session::new(
            Box::new(Fixed(scores)),
            labels,
            AcceptancePolicy::default(),
            2,
        )
        .unwrap_or_else(|e| panic!("{e}"))
    }

    fn image(id: usize) -> RawImage {
        RawImage::decoded(
            ImageId(id),
            format!("img{id}.png"),
            image::DynamicImage::new_rgb8(32, 16),
        )
    }

    #[test]
    fn test_empty_batch() {
        let session = session(vec![0.99, 0.005, 0.005]);
        assert!(session.process_batch(Vec::<RawImage>::new()).is_empty());
    }

    #[test]
    fn test_accepted_image() {
        let session = session(vec![0.99, 0.005, 0.005]);
        let report = session.classify(&image(0));

        assert!(report.is_accepted());
        assert_eq!(report.dimensions, Some(ImageDimensions::new(32, 16)));
        let classification = report.classification().unwrap_or_else(|| panic!("classified"));
        assert_eq!(classification.label, "WES_ANDERSON");
    }

    #[test]
    fn test_low_confidence_is_classified_but_not_accepted() {
        let session = session(vec![0.6, 0.3, 0.1]);
        let report = session.classify(&image(0));

        assert!(!report.is_failed());
        assert!(!report.is_accepted());
    }

    #[test]
    fn test_length_mismatch_fails_image() {
        let session = session(vec![0.25, 0.25, 0.25, 0.25]);
        let report = session.classify(&image(0));

        match report.status {
            ImageStatus::Failed { stage, error } => {
                assert_eq!(stage, FailureStage::Decision);
                assert_eq!(
                    error,
                    DecisionError::LengthMismatch {
                        labels: 3,
                        scores: 4
                    }
                    .to_string()
                );
            }
            ImageStatus::Classified { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn test_batch_spanning_several_chunks_keeps_order() {
        let session = session(vec![0.97, 0.02, 0.01]);
        // chunk size is 4, so 9 images span three chunks
        let matches = session.process_batch((0..9).map(image));

        let ids: Vec<usize> = matches.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_reports_knows_total_for_exact_iterators() {
        let session = session(vec![0.97, 0.02, 0.01]);
        let reports = session.reports(vec![image(0), image(1)], &NoProgress);
        assert_eq!(reports.total, Some(2));
    }

    #[test]
    fn test_unreadable_image_keeps_its_slot() {
        let session = session(vec![0.97, 0.02, 0.01]);
        let items = vec![
            Ok(image(0)),
            Err(AcquireError::new(ImageId(1), "gone.jpg", "No such file")),
            Ok(image(2)),
        ];

        let batch = session.run_batch(items, &NoProgress);

        assert_eq!(batch.reports.len(), 3);
        assert_eq!(batch.accepted(), 2);
        let failed = &batch.reports[1];
        assert_eq!(failed.id, ImageId(1));
        assert_eq!(failed.path, "gone.jpg");
        assert_eq!(failed.dimensions, None);
        assert_eq!(
            failed.status,
            ImageStatus::Failed {
                stage: FailureStage::Acquire,
                error: "No such file".into(),
            }
        );
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let err = InferenceError::Backend(Box::new(std::io::Error::other("device lost")));
        assert_eq!(error_chain(&err), "inference backend failed: device lost");
    }
}
