//! Inference engine using Candle.
//!
//! Provides device selection, model loading from safetensors and the
//! `MobileNetV2` classifier.

mod device;
mod loader;
mod mobilenet;

pub use device::{select_device, DevicePreference};
pub use loader::{load_labels, load_model, load_safetensors, LoadedModel, ModelPaths};
pub use mobilenet::{block_specs, parameter_shapes, BlockSpec, MobileNetV2};
