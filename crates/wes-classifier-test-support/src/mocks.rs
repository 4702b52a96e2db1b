//! Mock implementations of core port traits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use wes_classifier_core::domain::{ImageId, ImageReport, InputTensor, ProbabilityVector, RawImage};
use wes_classifier_core::error::{AcquireError, BoxError, InferenceError};
use wes_classifier_core::ports::{
    Classifier, ImageSource, ProgressEvent, ProgressSink, ResultOutput,
};

/// One scripted classifier response.
#[derive(Debug, Clone)]
enum Response {
    Scores(Vec<f32>),
    Fail(String),
}

/// Mock implementation of `Classifier` for testing.
///
/// Replays scripted responses in call order, repeating the last one once the
/// script runs out. Tracks how many calls overlap in time.
pub struct MockClassifier {
    script: Vec<Response>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    delay: Option<Duration>,
}

impl MockClassifier {
    /// Always returns `scores`.
    #[must_use]
    pub fn constant(scores: Vec<f32>) -> Self {
        Self::from_script(vec![Response::Scores(scores)])
    }

    /// Returns each vector in turn, then repeats the last one.
    #[must_use]
    pub fn sequence(vectors: Vec<Vec<f32>>) -> Self {
        Self::from_script(vectors.into_iter().map(Response::Scores).collect())
    }

    /// Always fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::from_script(vec![Response::Fail(message.into())])
    }

    fn from_script(script: Vec<Response>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Makes the call with the given index (0-based) fail.
    #[must_use]
    pub fn fail_at(mut self, index: usize, message: impl Into<String>) -> Self {
        let fallback = self
            .script
            .last()
            .cloned()
            .unwrap_or(Response::Scores(Vec::new()));
        while self.script.len() <= index {
            self.script.push(fallback.clone());
        }
        // keep repeating the last successful response after the failure
        if self.script.len() == index + 1 {
            self.script.push(fallback);
        }
        self.script[index] = Response::Fail(message.into());
        self
    }

    /// Sleeps this long inside every call.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of completed or in-flight calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at once.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl Classifier for MockClassifier {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn infer(&self, _input: &InputTensor) -> Result<ProbabilityVector, InferenceError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let response = self
            .script
            .get(index)
            .or_else(|| self.script.last())
            .cloned()
            .unwrap_or(Response::Scores(Vec::new()));

        self.active.fetch_sub(1, Ordering::SeqCst);

        match response {
            Response::Scores(scores) => Ok(ProbabilityVector::new(scores)),
            Response::Fail(message) => Err(InferenceError::Backend(BoxError::from(message))),
        }
    }
}

/// Mock implementation of `ImageSource` for testing.
///
/// Yields pre-built images (and read failures) and tracks iteration for assertions.
pub struct MockImageSource {
    entries: Vec<Result<RawImage, AcquireError>>,
    iteration_count: Arc<Mutex<usize>>,
}

impl MockImageSource {
    /// Creates a new mock source with the given images.
    #[must_use]
    pub fn new(images: Vec<RawImage>) -> Self {
        Self {
            entries: images.into_iter().map(Ok).collect(),
            iteration_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates an empty mock source.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Appends an entry that fails to read, with the next free id.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        let id = ImageId(self.entries.len());
        self.entries.push(Err(AcquireError::new(
            id,
            format!("unreadable://{}", id.0),
            message.into(),
        )));
        self
    }

    /// Returns the number of times the source has been iterated.
    #[must_use]
    pub fn iteration_count(&self) -> usize {
        *self
            .iteration_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ImageSource for MockImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = Result<RawImage, AcquireError>> + Send + '_> {
        *self
            .iteration_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;
        Box::new(self.entries.iter().cloned())
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// Mock implementation of `ResultOutput` for testing.
///
/// Captures reports for later assertions.
pub struct MockResultOutput {
    reports: Arc<Mutex<Vec<ImageReport>>>,
    flush_count: Arc<Mutex<usize>>,
}

impl MockResultOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reports: Arc::new(Mutex::new(Vec::new())),
            flush_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns all captured reports.
    #[must_use]
    pub fn reports(&self) -> Vec<ImageReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        *self
            .flush_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockResultOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultOutput for MockResultOutput {
    fn write(&self, report: &ImageReport) -> anyhow::Result<()> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        *self
            .flush_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
pub struct MockProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of `Started` events.
    #[must_use]
    pub fn started_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Started { .. }))
    }

    /// Returns the number of `Completed` events.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Completed { .. }))
    }

    /// Returns the number of `Skipped` events.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&ProgressEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    /// Returns the final `(classified, failed, matched)` counts, if finished.
    #[must_use]
    pub fn finished_counts(&self) -> Option<(usize, usize, usize)> {
        self.events().iter().find_map(|e| match e {
            ProgressEvent::Finished {
                classified,
                failed,
                matched,
            } => Some((*classified, *failed, *matched)),
            _ => None,
        })
    }
}

impl Default for MockProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
