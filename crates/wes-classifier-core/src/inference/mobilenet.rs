//! `MobileNetV2` image classifier.
//!
//! Backbone: `MobileNetV2` with width multiplier 1.0 and a 224x224 input.
//! Head: global average pooling, `Dense(128, relu)`, `Dense(num_classes)` and
//! softmax. Dropout from training is the identity at inference time.
//!
//! Weights come from a Keras export with BatchNorm folded into the
//! convolution biases, transposed to OIHW. Tensor names:
//!
//! - `stem.{weight,bias}`: 3x3/2 conv, 3 -> 32
//! - `blocks.{i}.expand.*`: 1x1 expansion (absent for expansion factor 1)
//! - `blocks.{i}.depthwise.*`: 3x3 depthwise
//! - `blocks.{i}.project.*`: 1x1 linear projection
//! - `head.{weight,bias}`: 1x1 conv, 320 -> 1280
//! - `fc1.*`, `fc2.*`: dense layers of the classification head

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]

use anyhow::{Context, Result};
use candle_core::{Device, Module, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, VarBuilder};
use tracing::debug;

use crate::domain::{InputTensor, ProbabilityVector};
use crate::error::InferenceError;
use crate::ports::Classifier;

/// Channels produced by the stem convolution.
const STEM_CHANNELS: usize = 32;

/// Channels produced by the final 1x1 convolution.
const HEAD_CHANNELS: usize = 1280;

/// Units in the hidden dense layer of the classification head.
const HIDDEN_UNITS: usize = 128;

/// Inverted residual stages: `(expansion, out_channels, repeats, first_stride)`.
const STAGES: [(usize, usize, usize, usize); 7] = [
    (1, 16, 1, 1),
    (6, 24, 2, 2),
    (6, 32, 3, 2),
    (6, 64, 4, 2),
    (6, 96, 3, 1),
    (6, 160, 3, 2),
    (6, 320, 1, 1),
];

/// Shape of one inverted residual block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    /// Input channels.
    pub in_channels: usize,
    /// Channels after expansion (equal to `in_channels` when there is no expansion).
    pub hidden_channels: usize,
    /// Output channels.
    pub out_channels: usize,
    /// Depthwise stride.
    pub stride: usize,
}

impl BlockSpec {
    /// True if the block has a 1x1 expansion convolution.
    #[must_use]
    pub const fn expands(&self) -> bool {
        self.hidden_channels != self.in_channels
    }

    /// True if the block adds its input to its output.
    #[must_use]
    pub const fn has_residual(&self) -> bool {
        self.stride == 1 && self.in_channels == self.out_channels
    }
}

/// The 17 inverted residual blocks in order.
#[must_use]
pub fn block_specs() -> Vec<BlockSpec> {
    let mut specs = Vec::new();
    let mut in_channels = STEM_CHANNELS;

    for (expansion, out_channels, repeats, first_stride) in STAGES {
        for i in 0..repeats {
            specs.push(BlockSpec {
                in_channels,
                hidden_channels: in_channels * expansion,
                out_channels,
                stride: if i == 0 { first_stride } else { 1 },
            });
            in_channels = out_channels;
        }
    }

    specs
}

/// Every tensor the model loads, with its expected shape.
#[must_use]
pub fn parameter_shapes(num_classes: usize) -> Vec<(String, Vec<usize>)> {
    fn conv(shapes: &mut Vec<(String, Vec<usize>)>, name: &str, out: usize, inp: usize, k: usize) {
        shapes.push((format!("{name}.weight"), vec![out, inp, k, k]));
        shapes.push((format!("{name}.bias"), vec![out]));
    }

    let mut shapes = Vec::new();
    conv(&mut shapes, "stem", STEM_CHANNELS, 3, 3);

    for (i, spec) in block_specs().iter().enumerate() {
        let prefix = format!("blocks.{i}");
        if spec.expands() {
            conv(
                &mut shapes,
                &format!("{prefix}.expand"),
                spec.hidden_channels,
                spec.in_channels,
                1,
            );
        }
        conv(
            &mut shapes,
            &format!("{prefix}.depthwise"),
            spec.hidden_channels,
            1,
            3,
        );
        conv(
            &mut shapes,
            &format!("{prefix}.project"),
            spec.out_channels,
            spec.hidden_channels,
            1,
        );
    }

    let last = block_specs().last().map_or(STEM_CHANNELS, |s| s.out_channels);
    conv(&mut shapes, "head", HEAD_CHANNELS, last, 1);

    shapes.push(("fc1.weight".into(), vec![HIDDEN_UNITS, HEAD_CHANNELS]));
    shapes.push(("fc1.bias".into(), vec![HIDDEN_UNITS]));
    shapes.push(("fc2.weight".into(), vec![num_classes, HIDDEN_UNITS]));
    shapes.push(("fc2.bias".into(), vec![num_classes]));

    shapes
}

/// Zero padding applied before stride-2 convolutions.
///
/// Pads bottom/right by one on even spatial sizes and one on every side on
/// odd sizes, matching "same" padding of the training framework.
fn correct_pad(x: &Tensor) -> candle_core::Result<Tensor> {
    let (_, _, h, w) = x.dims4()?;
    let (top, bottom) = if h % 2 == 0 { (0, 1) } else { (1, 1) };
    let (left, right) = if w % 2 == 0 { (0, 1) } else { (1, 1) };
    x.pad_with_zeros(2, top, bottom)?
        .pad_with_zeros(3, left, right)
}

fn relu6(x: &Tensor) -> candle_core::Result<Tensor> {
    x.clamp(0f32, 6f32)
}

/// Inverted residual block: expand, depthwise, project.
struct InvertedResidual {
    expand: Option<Conv2d>,
    depthwise: Conv2d,
    project: Conv2d,
    spec: BlockSpec,
}

impl InvertedResidual {
    fn new(spec: BlockSpec, vb: &VarBuilder) -> Result<Self> {
        let expand = if spec.expands() {
            Some(conv2d(
                spec.in_channels,
                spec.hidden_channels,
                1,
                Conv2dConfig::default(),
                vb.pp("expand"),
            )?)
        } else {
            None
        };

        let depthwise = conv2d(
            spec.hidden_channels,
            spec.hidden_channels,
            3,
            Conv2dConfig {
                stride: spec.stride,
                padding: usize::from(spec.stride == 1),
                groups: spec.hidden_channels,
                ..Conv2dConfig::default()
            },
            vb.pp("depthwise"),
        )?;

        let project = conv2d(
            spec.hidden_channels,
            spec.out_channels,
            1,
            Conv2dConfig::default(),
            vb.pp("project"),
        )?;

        Ok(Self {
            expand,
            depthwise,
            project,
            spec,
        })
    }
}

impl Module for InvertedResidual {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let h = match &self.expand {
            Some(expand) => relu6(&expand.forward(x)?)?,
            None => x.clone(),
        };

        let h = if self.spec.stride == 2 {
            correct_pad(&h)?
        } else {
            h
        };
        let h = relu6(&self.depthwise.forward(&h)?)?;

        // Linear bottleneck: no activation after projection
        let h = self.project.forward(&h)?;

        if self.spec.has_residual() {
            h + x
        } else {
            Ok(h)
        }
    }
}

/// `MobileNetV2` classifier with a dense classification head.
pub struct MobileNetV2 {
    stem: Conv2d,
    blocks: Vec<InvertedResidual>,
    head: Conv2d,
    fc1: Linear,
    fc2: Linear,
    num_classes: usize,
    device: Device,
}

impl MobileNetV2 {
    /// Creates the model from weights.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor is missing or has the wrong shape, which
    /// includes an output head whose width differs from `num_classes`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(vb: VarBuilder, num_classes: usize) -> Result<Self> {
        let device = vb.device().clone();

        let stem = conv2d(
            3,
            STEM_CHANNELS,
            3,
            Conv2dConfig {
                stride: 2,
                ..Conv2dConfig::default()
            },
            vb.pp("stem"),
        )
        .context("Failed to load stem")?;

        let mut blocks = Vec::new();
        for (i, spec) in block_specs().into_iter().enumerate() {
            let block = InvertedResidual::new(spec, &vb.pp(format!("blocks.{i}")))
                .with_context(|| format!("Failed to load block {i}"))?;
            blocks.push(block);
        }

        let last = blocks
            .last()
            .map_or(STEM_CHANNELS, |b| b.spec.out_channels);
        let head = conv2d(last, HEAD_CHANNELS, 1, Conv2dConfig::default(), vb.pp("head"))
            .context("Failed to load head convolution")?;

        let fc1 = linear(HEAD_CHANNELS, HIDDEN_UNITS, vb.pp("fc1")).context("Failed to load fc1")?;
        let fc2 = linear(HIDDEN_UNITS, num_classes, vb.pp("fc2"))
            .with_context(|| format!("Failed to load fc2 for {num_classes} classes"))?;

        debug!("MobileNetV2 loaded with {} blocks, {num_classes} classes", blocks.len());

        Ok(Self {
            stem,
            blocks,
            head,
            fc1,
            fc2,
            num_classes,
            device,
        })
    }

    /// Number of output classes.
    #[must_use]
    pub const fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Converts an NHWC input tensor to the NCHW layout used internally.
    fn to_device_tensor(&self, input: &InputTensor) -> candle_core::Result<Tensor> {
        Tensor::from_slice(input.as_slice(), &InputTensor::SHAPE, &self.device)?
            .permute((0, 3, 1, 2))?
            .contiguous()
    }
}

impl Module for MobileNetV2 {
    /// Maps an NCHW batch to class probabilities of shape `(batch, num_classes)`.
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let x = correct_pad(x)?;
        let mut h = relu6(&self.stem.forward(&x)?)?;

        for block in &self.blocks {
            h = block.forward(&h)?;
        }

        let h = relu6(&self.head.forward(&h)?)?;

        // Global average pooling over H and W
        let h = h.mean((2, 3))?;

        let h = self.fc1.forward(&h)?.relu()?;
        let logits = self.fc2.forward(&h)?;
        candle_nn::ops::softmax_last_dim(&logits)
    }
}

impl Classifier for MobileNetV2 {
    fn name(&self) -> &'static str {
        "mobilenet_v2"
    }

    fn infer(&self, input: &InputTensor) -> Result<ProbabilityVector, InferenceError> {
        let x = self.to_device_tensor(input)?;
        let scores = self.forward(&x)?.squeeze(0)?.to_vec1::<f32>()?;

        if scores.len() != self.num_classes {
            return Err(InferenceError::OutputLength {
                expected: self.num_classes,
                actual: scores.len(),
            });
        }

        Ok(ProbabilityVector::new(scores))
    }
}
