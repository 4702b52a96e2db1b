//! Test support utilities for wes-classifier.
//!
//! Provides mocks for every port, synthetic image builders, and a writer for
//! model artifacts whose output is known in advance.
//!
//! # Example
//!
//! ```
//! use wes_classifier_test_support::{MockClassifier, SyntheticImageBuilder};
//!
//! // Three decoded images and a classifier that is sure about the first label
//! let images = SyntheticImageBuilder::batch(3);
//! let classifier = MockClassifier::constant(vec![0.97, 0.02, 0.01]);
//! ```

mod builders;
mod mocks;
mod model;

pub use builders::SyntheticImageBuilder;
pub use mocks::{MockClassifier, MockImageSource, MockProgressSink, MockResultOutput};
pub use model::{
    write_constant_model, write_labels, CONFIDENT_FIRST, CONFIDENT_THIRD, UNSURE_FIRST,
};
