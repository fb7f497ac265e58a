//! Dataset lifecycle for transfer-learning fine-tuning.
//!
//! This crate covers everything between "a dataset URL" and "tensors ready
//! for a training loop":
//!
//! # Dataset Preparation
//!
//! - [`DatasetPreparer`] - Idempotent download and extraction of a zip
//!   archive into a local directory tree.
//!
//! # Labeled Image Collections
//!
//! - [`ImageFolder`] - Directory-backed `(image, label)` pairs, one
//!   subdirectory per class (`train/<class>/*`, `val/<class>/*`).
//! - [`ImageSample`] - A single decoded sample in CHW layout.
//!
//! # Transform Pipelines
//!
//! - [`TransformPipeline`] - Ordered image transformations applied lazily
//!   per sample. Train presets are randomized (crop jitter, coin-flip
//!   mirror); eval presets are deterministic (resize + center crop).
//!
//! # Example
//!
//! ```no_run
//! use ft_dataset::{DatasetPreparer, ImageFolder, TransformPipeline};
//! use rand::SeedableRng;
//!
//! let preparer = DatasetPreparer::new(
//!     "https://download.pytorch.org/tutorial/hymenoptera_data.zip",
//!     "hymenoptera_data.zip",
//!     "hymenoptera_data",
//! );
//! let root = preparer.prepare("data").unwrap();
//!
//! let train = ImageFolder::from_dir(root.join("train")).unwrap();
//! let pipeline = TransformPipeline::train_preset(224);
//! let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(42);
//! let sample = train.load(0, &pipeline, &mut rng).unwrap();
//! assert_eq!(sample.image_chw.len(), 3 * 224 * 224);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod folder;
mod prepare;
mod sample;
mod transform;

// Re-export preparation
pub use prepare::DatasetPreparer;

// Re-export collection types
pub use folder::ImageFolder;
pub use sample::ImageSample;

// Re-export transforms
pub use transform::{Transform, TransformPipeline, IMAGENET_MEAN, IMAGENET_STD};

// Re-export error types
pub use error::{DatasetError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        DatasetError, DatasetPreparer, ImageFolder, ImageSample, Transform, TransformPipeline,
        IMAGENET_MEAN, IMAGENET_STD,
    };
}
