//! Convolutional image classifier with a replaceable head.
//!
//! The model splits into a convolutional backbone that produces a fixed
//! feature vector and a single linear head that maps features to class
//! logits. Fine-tuning swaps the head for the target class count while
//! the backbone keeps (and optionally freezes) its pretrained weights.

use std::path::Path;

use burn::module::Module;
use burn::nn;
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig};
use burn::prelude::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::checkpoint::load_checkpoint;
use crate::error::Result;

/// Configuration for the image classifier.
///
/// # Example
///
/// ```
/// use ft_models::ImageClassifierConfig;
///
/// let config = ImageClassifierConfig::new(2);
/// assert_eq!(config.num_classes, 2);
/// assert!(config.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageClassifierConfig {
    /// Number of output classes.
    pub num_classes: usize,

    /// Channel widths of the four backbone stages.
    pub channels: [usize; 4],
}

impl Default for ImageClassifierConfig {
    fn default() -> Self {
        Self {
            num_classes: 2,
            channels: [16, 32, 64, 128],
        }
    }
}

impl ImageClassifierConfig {
    /// Creates a configuration for `num_classes` output classes.
    #[must_use]
    pub const fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            channels: [16, 32, 64, 128],
        }
    }

    /// Sets the backbone stage widths.
    #[must_use]
    pub const fn with_channels(mut self, channels: [usize; 4]) -> Self {
        self.channels = channels;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns `true` if the class count and every stage width are positive.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.num_classes > 0
            && self.channels[0] > 0
            && self.channels[1] > 0
            && self.channels[2] > 0
            && self.channels[3] > 0
    }

    /// Returns the feature dimension the backbone produces.
    #[must_use]
    pub const fn feature_dim(&self) -> usize {
        self.channels[3]
    }
}

/// A 3x3 convolution followed by `ReLU`.
#[derive(Debug, Module)]
struct ConvBlock<B: Backend> {
    conv: nn::conv::Conv2d<B>,
    relu: nn::Relu,
}

impl<B: Backend> ConvBlock<B> {
    fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = nn::conv::Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(nn::PaddingConfig2d::Explicit(1, 1))
            .init(device);
        Self {
            conv,
            relu: nn::Relu::new(),
        }
    }

    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.relu.forward(self.conv.forward(input))
    }
}

/// Convolutional feature extractor.
///
/// Four conv stages with 2x2 max-pool downsampling between them, ending
/// in global average pooling. Output is a `[batch, channels[3]]` feature
/// tensor regardless of input resolution.
#[derive(Debug, Module)]
pub struct Backbone<B: Backend> {
    stage1: ConvBlock<B>,
    stage2: ConvBlock<B>,
    stage3: ConvBlock<B>,
    stage4: ConvBlock<B>,
    pool: MaxPool2d,
    avg_pool: AdaptiveAvgPool2d,
}

impl<B: Backend> Backbone<B> {
    /// Creates a backbone with the given stage widths.
    #[must_use]
    pub fn new(channels: [usize; 4], device: &B::Device) -> Self {
        Self {
            stage1: ConvBlock::new(3, channels[0], device),
            stage2: ConvBlock::new(channels[0], channels[1], device),
            stage3: ConvBlock::new(channels[1], channels[2], device),
            stage4: ConvBlock::new(channels[2], channels[3], device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            avg_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
        }
    }

    /// Runs the feature extractor.
    ///
    /// Input shape `[batch, 3, height, width]`, output `[batch, channels]`.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(self.stage1.forward(input));
        let x = self.pool.forward(self.stage2.forward(x));
        let x = self.pool.forward(self.stage3.forward(x));
        let x = self.stage4.forward(x);
        let x = self.avg_pool.forward(x);
        x.flatten(1, 3)
    }
}

/// An image classifier built from a [`Backbone`] and a linear head.
///
/// # Type Parameters
///
/// - `B`: The Burn backend (e.g., `NdArray`, `Wgpu`)
///
/// # Example
///
/// ```ignore
/// use ft_models::{ImageClassifier, ImageClassifierConfig};
///
/// let config = ImageClassifierConfig::new(1000);
/// let model = ImageClassifier::<MyBackend>::new(config, &device);
///
/// // Swap the 1000-class head for a 2-class one before fine-tuning.
/// let model = model.with_head(2, &device);
/// ```
#[derive(Debug, Module)]
pub struct ImageClassifier<B: Backend> {
    backbone: Backbone<B>,
    head: nn::Linear<B>,
}

impl<B: Backend> ImageClassifier<B> {
    /// Creates a classifier with freshly initialized weights.
    #[must_use]
    pub fn new(config: ImageClassifierConfig, device: &B::Device) -> Self {
        let backbone = Backbone::new(config.channels, device);
        let head = nn::LinearConfig::new(config.feature_dim(), config.num_classes).init(device);
        Self { backbone, head }
    }

    /// Loads pretrained weights and replaces the head for `num_classes`.
    ///
    /// The checkpoint must have been saved from a model built with the
    /// same `config`, including its original class count. The returned
    /// model keeps the pretrained backbone and gets a fresh head.
    ///
    /// # Errors
    ///
    /// Returns a checkpoint error if the file is missing or its record
    /// does not match `config`.
    pub fn from_pretrained(
        config: ImageClassifierConfig,
        path: impl AsRef<Path>,
        num_classes: usize,
        device: &B::Device,
    ) -> Result<Self> {
        let model = Self::new(config, device);
        let model = load_checkpoint(model, path, device)?;
        Ok(model.with_head(num_classes, device))
    }

    /// Replaces the head with a fresh linear layer for `num_classes`.
    ///
    /// Backbone weights are untouched.
    #[must_use]
    pub fn with_head(mut self, num_classes: usize, device: &B::Device) -> Self {
        let feature_dim = self.head.weight.dims()[0];
        self.head = nn::LinearConfig::new(feature_dim, num_classes).init(device);
        self
    }

    /// Detaches the backbone from gradient tracking.
    ///
    /// After freezing, optimizer steps update only the head. The backbone
    /// still runs in the forward pass.
    #[must_use]
    pub fn freeze_backbone(mut self) -> Self {
        self.backbone = self.backbone.no_grad();
        self
    }

    /// Runs the full forward pass.
    ///
    /// Input shape `[batch, 3, height, width]`, output
    /// `[batch, num_classes]` logits.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        self.head.forward(self.backbone.forward(input))
    }

    /// Runs only the backbone, returning `[batch, feature_dim]` features.
    pub fn features(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        self.backbone.forward(input)
    }

    /// Returns the number of output classes.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.head.weight.dims()[1]
    }
}
