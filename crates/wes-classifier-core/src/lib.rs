//! Wes Classifier Core - Domain logic and the classification pipeline
//!
//! This crate contains the domain types, ports, preprocessing, decision
//! policy, batch session, evaluation metrics and the candle inference engine.

pub mod domain;
pub mod error;
pub mod evaluation;
pub mod inference;
pub mod pipeline;
pub mod policy;
pub mod ports;
pub mod preprocess;

pub use domain::{
    Acquired, BatchReport, Classification, ClassificationResult, FailureStage, ImageDimensions,
    ImageId, ImageReport, ImageStatus, InputTensor, LabelSet, ProbabilityVector, RawImage,
    WES_ANDERSON,
};
pub use error::{AcquireError, DecisionError, InferenceError, LoadError, PreprocessError};
pub use evaluation::{ClassMetrics, Evaluation, EvaluationSummary};
pub use pipeline::{Session, DEFAULT_THREADS};
pub use policy::{decide, AcceptancePolicy, DEFAULT_MIN_CONFIDENCE};
pub use ports::{Classifier, ImageSource, NoProgress, ProgressEvent, ProgressSink, ResultOutput};
