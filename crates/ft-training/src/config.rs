//! Training configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for a fine-tuning run.
///
/// Immutable once training starts; build it up front with the setters.
///
/// # Example
///
/// ```
/// use ft_training::TrainingConfig;
///
/// let config = TrainingConfig::default();
/// assert_eq!(config.epochs, 25);
/// assert_eq!(config.batch_size, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of training epochs.
    pub epochs: usize,

    /// Batch size.
    pub batch_size: usize,

    /// Optimizer configuration.
    pub optimizer: OptimizerConfig,

    /// Learning rate schedule.
    pub lr_schedule: LearningRateSchedule,

    /// Whether to shuffle training data each epoch.
    pub shuffle: bool,

    /// Worker count hint for data loading.
    ///
    /// Recorded and logged; batching in this crate is synchronous.
    pub num_workers: usize,

    /// Whether to freeze the backbone before the first epoch.
    pub freeze_backbone: bool,

    /// Checkpoint path stem (extension is added by the format).
    pub checkpoint_path: PathBuf,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::new(25)
    }
}

impl TrainingConfig {
    /// Creates a training config with the given epochs.
    ///
    /// Defaults follow the standard fine-tuning recipe: batch size 4,
    /// SGD with momentum 0.9 at lr 0.001, shuffled data.
    #[must_use]
    pub fn new(epochs: usize) -> Self {
        Self {
            epochs,
            batch_size: 4,
            optimizer: OptimizerConfig::sgd_momentum(1e-3, 0.9),
            lr_schedule: LearningRateSchedule::Constant,
            shuffle: true,
            num_workers: 4,
            freeze_backbone: false,
            checkpoint_path: PathBuf::from("checkpoints/best"),
            seed: None,
        }
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the optimizer.
    #[must_use]
    pub const fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Sets the learning rate schedule.
    #[must_use]
    pub const fn with_lr_schedule(mut self, schedule: LearningRateSchedule) -> Self {
        self.lr_schedule = schedule;
        self
    }

    /// Sets the worker count hint.
    #[must_use]
    pub const fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Freezes the backbone for the whole run.
    #[must_use]
    pub const fn with_frozen_backbone(mut self) -> Self {
        self.freeze_backbone = true;
        self
    }

    /// Sets the checkpoint path stem.
    #[must_use]
    pub fn with_checkpoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = path.into();
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Disables shuffling.
    #[must_use]
    pub const fn without_shuffle(mut self) -> Self {
        self.shuffle = false;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns `true` if all values are valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.epochs > 0 && self.batch_size > 0 && self.optimizer.is_valid()
    }
}

/// Optimizer configuration.
///
/// # Example
///
/// ```
/// use ft_training::OptimizerConfig;
///
/// let sgd = OptimizerConfig::sgd_momentum(1e-3, 0.9);
/// assert_eq!(sgd.learning_rate, 1e-3);
/// assert_eq!(sgd.momentum, 0.9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Base learning rate.
    pub learning_rate: f64,

    /// Weight decay (L2 regularization).
    pub weight_decay: f32,

    /// Optimizer type.
    pub optimizer_type: OptimizerType,

    /// Momentum (for SGD).
    pub momentum: f64,

    /// Beta1 (for Adam).
    pub beta1: f32,

    /// Beta2 (for Adam).
    pub beta2: f32,

    /// Epsilon for numerical stability.
    pub epsilon: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::sgd_momentum(1e-3, 0.9)
    }
}

impl OptimizerConfig {
    /// Creates an SGD optimizer config without momentum.
    #[must_use]
    pub const fn sgd(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            weight_decay: 0.0,
            optimizer_type: OptimizerType::Sgd,
            momentum: 0.0,
            beta1: 0.0,
            beta2: 0.0,
            epsilon: 1e-8,
        }
    }

    /// Creates an SGD with momentum optimizer config.
    #[must_use]
    pub const fn sgd_momentum(learning_rate: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            weight_decay: 0.0,
            optimizer_type: OptimizerType::SgdMomentum,
            momentum,
            beta1: 0.0,
            beta2: 0.0,
            epsilon: 1e-8,
        }
    }

    /// Creates an Adam optimizer config.
    #[must_use]
    pub const fn adam(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            weight_decay: 0.0,
            optimizer_type: OptimizerType::Adam,
            momentum: 0.0,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }

    /// Sets weight decay.
    #[must_use]
    pub const fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Validates the configuration.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.learning_rate > 0.0
            && self.weight_decay >= 0.0
            && self.momentum >= 0.0
            && self.momentum <= 1.0
            && self.beta1 >= 0.0
            && self.beta1 < 1.0
            && self.beta2 >= 0.0
            && self.beta2 < 1.0
            && self.epsilon > 0.0
    }
}

/// Type of optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptimizerType {
    /// Stochastic Gradient Descent.
    Sgd,
    /// SGD with momentum.
    SgdMomentum,
    /// Adam optimizer.
    Adam,
}

/// Learning rate schedule.
///
/// # Example
///
/// ```
/// use ft_training::LearningRateSchedule;
///
/// let schedule = LearningRateSchedule::step(0.1, 7);
/// assert!((schedule.compute_lr(1e-3, 7) - 1e-4).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum LearningRateSchedule {
    /// Constant learning rate.
    #[default]
    Constant,

    /// Step decay: multiply by `gamma` every `step_size` epochs.
    Step {
        /// Decay factor.
        gamma: f64,
        /// Epochs between decays.
        step_size: usize,
    },

    /// Exponential decay: lr * gamma^epoch.
    Exponential {
        /// Decay rate per epoch.
        gamma: f64,
    },
}

impl LearningRateSchedule {
    /// Creates a step decay schedule.
    #[must_use]
    pub const fn step(gamma: f64, step_size: usize) -> Self {
        Self::Step { gamma, step_size }
    }

    /// Creates an exponential decay schedule.
    #[must_use]
    pub const fn exponential(gamma: f64) -> Self {
        Self::Exponential { gamma }
    }

    /// Computes the learning rate for a given epoch (0-indexed).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn compute_lr(&self, base_lr: f64, epoch: usize) -> f64 {
        match self {
            Self::Constant => base_lr,

            Self::Step { gamma, step_size } => {
                if *step_size == 0 {
                    base_lr
                } else {
                    let decays = epoch / step_size;
                    base_lr * gamma.powi(decays as i32)
                }
            }

            Self::Exponential { gamma } => base_lr * gamma.powi(epoch as i32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.epochs, 25);
        assert_eq!(config.batch_size, 4);
        assert!(config.shuffle);
        assert!(!config.freeze_backbone);
        assert_eq!(config.optimizer.optimizer_type, OptimizerType::SgdMomentum);
        assert!(config.is_valid());
    }

    #[test]
    fn training_config_builder() {
        let config = TrainingConfig::new(10)
            .with_batch_size(8)
            .with_num_workers(2)
            .with_frozen_backbone()
            .with_checkpoint_path("run/best")
            .with_seed(42)
            .without_shuffle();

        assert_eq!(config.epochs, 10);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.num_workers, 2);
        assert!(config.freeze_backbone);
        assert_eq!(config.checkpoint_path, PathBuf::from("run/best"));
        assert_eq!(config.seed, Some(42));
        assert!(!config.shuffle);
    }

    #[test]
    fn training_config_invalid() {
        let mut config = TrainingConfig::default();
        config.epochs = 0;
        assert!(!config.is_valid());

        config = TrainingConfig::default();
        config.batch_size = 0;
        assert!(!config.is_valid());

        config = TrainingConfig::default();
        config.optimizer.learning_rate = 0.0;
        assert!(!config.is_valid());
    }

    #[test]
    fn optimizer_config_sgd() {
        let config = OptimizerConfig::sgd(0.01);
        assert_eq!(config.optimizer_type, OptimizerType::Sgd);
        assert!((config.learning_rate - 0.01).abs() < 1e-12);
        assert!(config.is_valid());
    }

    #[test]
    fn optimizer_config_sgd_momentum() {
        let config = OptimizerConfig::sgd_momentum(1e-3, 0.9);
        assert_eq!(config.optimizer_type, OptimizerType::SgdMomentum);
        assert!((config.momentum - 0.9).abs() < 1e-12);
    }

    #[test]
    fn optimizer_config_adam() {
        let config = OptimizerConfig::adam(1e-3);
        assert_eq!(config.optimizer_type, OptimizerType::Adam);
        assert!((f64::from(config.beta1) - 0.9).abs() < 1e-6);
        assert!(config.is_valid());
    }

    #[test]
    fn optimizer_config_weight_decay() {
        let config = OptimizerConfig::adam(1e-3).with_weight_decay(1e-4);
        assert!((config.weight_decay - 1e-4).abs() < 1e-12);
    }

    #[test]
    fn lr_schedule_constant() {
        let schedule = LearningRateSchedule::Constant;
        assert!((schedule.compute_lr(0.01, 0) - 0.01).abs() < 1e-12);
        assert!((schedule.compute_lr(0.01, 50) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn lr_schedule_step_reproduces_fine_tuning_recipe() {
        // base 0.001, decay by 0.1 every 7 epochs
        let schedule = LearningRateSchedule::step(0.1, 7);

        for epoch in 0..7 {
            assert!((schedule.compute_lr(1e-3, epoch) - 1e-3).abs() < 1e-12);
        }
        for epoch in 7..14 {
            assert!((schedule.compute_lr(1e-3, epoch) - 1e-4).abs() < 1e-12);
        }
        assert!((schedule.compute_lr(1e-3, 14) - 1e-5).abs() < 1e-12);
    }

    #[test]
    fn lr_schedule_step_zero_step_size_is_constant() {
        let schedule = LearningRateSchedule::step(0.1, 0);
        assert!((schedule.compute_lr(1e-3, 100) - 1e-3).abs() < 1e-12);
    }

    #[test]
    fn lr_schedule_exponential() {
        let schedule = LearningRateSchedule::exponential(0.95);
        assert!((schedule.compute_lr(1.0, 0) - 1.0).abs() < 1e-12);
        assert!((schedule.compute_lr(1.0, 1) - 0.95).abs() < 1e-12);
        assert!((schedule.compute_lr(1.0, 2) - 0.9025).abs() < 1e-9);
    }

    #[test]
    fn config_serialization() {
        let config = TrainingConfig::default().with_lr_schedule(LearningRateSchedule::step(0.1, 7));
        let json = serde_json::to_string(&config);
        assert!(json.is_ok());

        let parsed: std::result::Result<TrainingConfig, _> =
            serde_json::from_str(&json.unwrap_or_default());
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap_or_default(), config);
    }

    #[test]
    fn optimizer_config_serialization() {
        let config = OptimizerConfig::sgd_momentum(1e-3, 0.9);
        let json = serde_json::to_string(&config);
        assert!(json.is_ok());
    }

    #[test]
    fn lr_schedule_serialization() {
        let schedule = LearningRateSchedule::step(0.1, 7);
        let json = serde_json::to_string(&schedule);
        assert!(json.is_ok());
    }
}
