//! Wes Classifier Adapters - External adapters for wes-classifier.
//!
//! This crate provides adapters for:
//! - Filesystem image sources (flat and labeled directories)
//! - Model directory resolution and downloading

pub mod fs;
pub mod models;

pub use fs::{FsImageSource, LabeledImageSource};
pub use models::{model_path, model_paths_in, models_dir, set_models_dir};
