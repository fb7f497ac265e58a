//! Transfer-learning fine-tuning for image classifiers.
//!
//! This crate provides the training side of the fine-tuning pipeline:
//!
//! - [`Trainer`]: blocking training orchestrator with a [`Trainer::fit`]
//!   entry point covering train, validation and callback phases
//! - [`TrainingConfig`]: optimizer, schedule and loop configuration
//! - [`Callback`]: epoch-boundary hooks, with [`StepLr`] and
//!   [`BestCheckpoint`] implementations
//! - [`ImageBatcher`]: sample-to-tensor batch assembly
//! - [`RunMetrics`]: per-epoch and aggregate training metrics
//!
//! # Example
//!
//! ```
//! use ft_training::{
//!     BestCheckpoint, CallbackList, LearningRateSchedule, StepLr, Trainer, TrainingConfig,
//! };
//!
//! let config = TrainingConfig::new(25)
//!     .with_batch_size(4)
//!     .with_checkpoint_path("checkpoints/best")
//!     .with_seed(42);
//!
//! let mut callbacks = CallbackList::new();
//! callbacks.push(StepLr::new(7, 0.1));
//! callbacks.push(BestCheckpoint::new());
//!
//! let trainer = Trainer::new(config);
//! assert_eq!(trainer.config().epochs, 25);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod batch;
pub mod callback;
pub mod config;
pub mod error;
pub mod metrics;
pub mod trainer;

pub use batch::ImageBatcher;
pub use callback::{
    BestCheckpoint, Callback, CallbackAction, CallbackContext, CallbackList, StepLr,
};
pub use config::{LearningRateSchedule, OptimizerConfig, OptimizerType, TrainingConfig};
pub use error::{Result, TrainingError};
pub use metrics::{EpochMetrics, RunMetrics};
pub use trainer::{FitOutcome, Trainer, TrainingState};

/// Commonly used types for training.
pub mod prelude {
    pub use crate::batch::ImageBatcher;
    pub use crate::callback::{
        BestCheckpoint, Callback, CallbackAction, CallbackContext, CallbackList, StepLr,
    };
    pub use crate::config::{
        LearningRateSchedule, OptimizerConfig, OptimizerType, TrainingConfig,
    };
    pub use crate::error::{Result, TrainingError};
    pub use crate::metrics::{EpochMetrics, RunMetrics};
    pub use crate::trainer::{FitOutcome, Trainer, TrainingState};
}
