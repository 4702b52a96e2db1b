//! Loading the classifier and its label list from disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use safetensors::SafeTensors;
use tracing::{debug, info};

use super::mobilenet::MobileNetV2;
use crate::domain::LabelSet;
use crate::error::LoadError;

/// Locations of the two model artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    /// Safetensors weights.
    pub model: PathBuf,
    /// Newline-separated label list.
    pub labels: PathBuf,
}

/// A classifier ready for inference together with its label set.
pub struct LoadedModel {
    /// Network built from the weights file.
    pub classifier: MobileNetV2,
    /// Labels in output order; as many as the network has outputs.
    pub labels: LabelSet,
}

/// Loads the model weights and labels.
///
/// Checks run in order: weights present, labels readable and non-empty,
/// weights parse with every tensor at its expected shape. The output head
/// must be exactly as wide as the label list.
///
/// # Errors
///
/// - [`LoadError::ModelNotFound`] if the weights file does not exist
/// - [`LoadError::LabelsInvalid`] if the label list is unreadable or empty
/// - [`LoadError::ModelCorrupt`] if the weights cannot be parsed or do not fit
pub fn load_model(paths: &ModelPaths, device: &Device) -> Result<LoadedModel, LoadError> {
    if !paths.model.is_file() {
        return Err(LoadError::ModelNotFound {
            path: paths.model.clone(),
        });
    }

    let labels = load_labels(&paths.labels)?;

    let corrupt = |e: anyhow::Error| LoadError::ModelCorrupt {
        path: paths.model.clone(),
        source: e.into(),
    };
    let vb = load_safetensors(&paths.model, device).map_err(corrupt)?;
    let classifier = MobileNetV2::new(vb, labels.len()).map_err(corrupt)?;

    info!(
        "Loaded {} with {} labels from {}",
        crate::ports::Classifier::name(&classifier),
        labels.len(),
        paths.model.display()
    );

    Ok(LoadedModel { classifier, labels })
}

/// Reads a label list: one label per line, whitespace trimmed, blanks skipped.
///
/// # Errors
///
/// Returns [`LoadError::LabelsInvalid`] if the file cannot be read or holds no labels.
pub fn load_labels(path: &Path) -> Result<LabelSet, LoadError> {
    let invalid = |reason: String| LoadError::LabelsInvalid {
        path: path.to_path_buf(),
        reason,
    };

    let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let labels = LabelSet::parse(&text).ok_or_else(|| invalid("no labels found".into()))?;

    debug!("Read {} labels from {}", labels.len(), path.display());
    Ok(labels)
}

/// Loads a safetensors file and creates a `VarBuilder` for the model.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The safetensors data is invalid
/// - A tensor uses a dtype the backend cannot hold
pub fn load_safetensors(path: impl AsRef<Path>, device: &Device) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    debug!("Loading safetensors from {}", path.display());

    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read model file: {}", path.display()))?;

    let tensors = SafeTensors::deserialize(&data)
        .with_context(|| format!("Failed to parse safetensors: {}", path.display()))?;

    let mut tensor_map: HashMap<String, Tensor> = HashMap::new();

    for name in tensors.names() {
        let view = tensors
            .tensor(name)
            .with_context(|| format!("Failed to get tensor '{name}'"))?;

        let dtype = safetensors_dtype_to_candle(view.dtype())?;
        let tensor = Tensor::from_raw_buffer(view.data(), dtype, view.shape(), device)
            .with_context(|| format!("Failed to create tensor '{name}'"))?;

        tensor_map.insert(name.clone(), tensor);
    }

    debug!("Read {} tensors", tensor_map.len());

    // Half-precision exports are upcast on access
    Ok(VarBuilder::from_tensors(tensor_map, DType::F32, device))
}

fn safetensors_dtype_to_candle(dtype: safetensors::Dtype) -> Result<DType> {
    use safetensors::Dtype as S;
    match dtype {
        S::F32 => Ok(DType::F32),
        S::F64 => Ok(DType::F64),
        S::F16 => Ok(DType::F16),
        S::BF16 => Ok(DType::BF16),
        other => anyhow::bail!("Unsupported dtype: {other:?}"),
    }
}
