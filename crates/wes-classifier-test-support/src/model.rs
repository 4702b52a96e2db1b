//! Model artifacts with a known, input-independent output.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use safetensors::tensor::TensorView;
use safetensors::Dtype;
use wes_classifier_core::inference::parameter_shapes;

/// Writes a structurally valid `MobileNetV2` whose output is `softmax(logits)`.
///
/// Every weight is zero, so the backbone produces zeros for any image and the
/// final layer's bias decides the result.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_constant_model(path: &Path, logits: &[f32]) -> Result<()> {
    let shapes = parameter_shapes(logits.len());
    let data: Vec<(String, Vec<usize>, Vec<f32>)> = shapes
        .into_iter()
        .map(|(name, shape)| {
            let values = if name == "fc2.bias" {
                logits.to_vec()
            } else {
                vec![0.0; shape.iter().product()]
            };
            (name, shape, values)
        })
        .collect();

    let mut views = HashMap::new();
    for (name, shape, values) in &data {
        let view = TensorView::new(Dtype::F32, shape.clone(), bytemuck::cast_slice(values))
            .with_context(|| format!("Invalid tensor {name}"))?;
        views.insert(name.clone(), view);
    }

    let bytes = safetensors::serialize(&views, &None).context("Failed to serialize model")?;
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

/// Writes a newline-separated label list.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_labels(path: &Path, labels: &[&str]) -> Result<()> {
    let mut text = labels.join("\n");
    text.push('\n');
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

/// Logits that make the first of three labels win with ~99.99% confidence.
pub const CONFIDENT_FIRST: [f32; 3] = [10.0, 0.0, 0.0];

/// Logits that make the first of three labels win with ~78.7% confidence.
pub const UNSURE_FIRST: [f32; 3] = [2.0, 0.0, 0.0];

/// Logits that make the third of three labels win with ~99.99% confidence.
pub const CONFIDENT_THIRD: [f32; 3] = [0.0, 0.0, 10.0];
