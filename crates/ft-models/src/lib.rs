//! Burn model architectures and checkpoint persistence for fine-tuning.
//!
//! This crate provides a convolutional [`ImageClassifier`] built with the
//! Burn framework, designed around the transfer-learning workflow: load a
//! pretrained checkpoint, swap the final linear head for the target class
//! count, and optionally freeze the backbone so only the head trains.
//!
//! # Checkpoint Persistence
//!
//! Models save and load their weights through Burn's recorder system:
//! - Binary format (compact, fast)
//! - JSON format (human-readable, debuggable)
//!
//! # Backend Support
//!
//! Models are generic over Burn backends. Common choices:
//! - `burn-ndarray` - CPU inference/training (default)
//! - `burn-wgpu` - GPU inference/training (optional feature)
//!
//! # Example
//!
//! ```ignore
//! use ft_models::{ImageClassifier, ImageClassifierConfig};
//!
//! let config = ImageClassifierConfig::new(1000);
//! let model = ImageClassifier::<MyBackend>::from_pretrained(
//!     config,
//!     "pretrained.bin",
//!     2,
//!     &device,
//! )?;
//! let model = model.freeze_backbone();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod backend;
mod checkpoint;
mod classifier;
mod error;

// Re-export model types
pub use classifier::{Backbone, ImageClassifier, ImageClassifierConfig};

// Re-export checkpoint utilities
pub use checkpoint::{load_checkpoint, save_checkpoint, CheckpointFormat};

// Re-export backend utilities
pub use backend::BackendType;

// Re-export error types
pub use error::{ModelError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        load_checkpoint, save_checkpoint, BackendType, CheckpointFormat, ImageClassifier,
        ImageClassifierConfig, ModelError,
    };
}
