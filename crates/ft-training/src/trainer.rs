//! Training loop implementation.

use std::path::PathBuf;
use std::time::Instant;

use burn::module::AutodiffModule;
use burn::nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig};
use burn::optim::decay::WeightDecayConfig;
use burn::optim::momentum::MomentumConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer, SgdConfig};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ft_dataset::ImageSample;
use ft_models::{save_checkpoint, CheckpointFormat, ImageClassifier};

use crate::batch::ImageBatcher;
use crate::callback::{CallbackAction, CallbackContext, CallbackList};
use crate::config::{LearningRateSchedule, OptimizerType, TrainingConfig};
use crate::error::{Result, TrainingError};
use crate::metrics::{EpochMetrics, RunMetrics};

/// State of a training run.
///
/// # Example
///
/// ```
/// use ft_training::TrainingState;
///
/// let state = TrainingState::new();
/// assert_eq!(state.epoch, 0);
/// assert!(!state.is_finished());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    /// Current epoch (0-indexed).
    pub epoch: usize,

    /// Total epochs to run.
    pub total_epochs: usize,

    /// Best validation accuracy seen.
    pub best_val_accuracy: Option<f32>,

    /// Whether training has finished.
    pub finished: bool,
}

impl Default for TrainingState {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingState {
    /// Creates a new training state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            epoch: 0,
            total_epochs: 0,
            best_val_accuracy: None,
            finished: false,
        }
    }

    /// Creates a training state for the given config.
    #[must_use]
    pub const fn from_config(config: &TrainingConfig) -> Self {
        Self {
            epoch: 0,
            total_epochs: config.epochs,
            best_val_accuracy: None,
            finished: false,
        }
    }

    /// Returns true if training is finished.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns the progress as a fraction [0, 1].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f32 {
        if self.total_epochs == 0 {
            0.0
        } else {
            self.epoch as f32 / self.total_epochs as f32
        }
    }

    /// Advances to the next epoch.
    pub const fn next_epoch(&mut self) {
        self.epoch += 1;
        if self.epoch >= self.total_epochs {
            self.finished = true;
        }
    }

    /// Records validation accuracy.
    ///
    /// Returns true if this strictly beats the previous best.
    pub fn record_val_accuracy(&mut self, accuracy: f32) -> bool {
        let improved = self
            .best_val_accuracy
            .map_or(true, |best| accuracy > best);
        if improved {
            self.best_val_accuracy = Some(accuracy);
        }
        improved
    }
}

/// Result of a completed training run.
#[derive(Debug)]
pub struct FitOutcome<B: AutodiffBackend> {
    /// The trained model in its final state.
    pub model: ImageClassifier<B>,

    /// Per-epoch and aggregate metrics.
    pub metrics: RunMetrics,

    /// Path of the last checkpoint written, if any callback requested one.
    pub checkpoint: Option<PathBuf>,
}

/// Blocking training orchestrator.
///
/// Runs the full fine-tuning loop: per epoch a shuffled pass over the
/// training samples with cross-entropy loss and optimizer steps, a
/// no-grad validation pass computing loss and accuracy, then callback
/// dispatch. Checkpoint saves and stops requested by callbacks are
/// honored between epochs.
///
/// # Example
///
/// ```
/// use ft_training::{Trainer, TrainingConfig};
///
/// let config = TrainingConfig::new(10);
/// let trainer = Trainer::new(config);
///
/// assert_eq!(trainer.config().epochs, 10);
/// ```
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(TrainingConfig::default())
    }
}

impl Trainer {
    /// Creates a new trainer with the given config.
    #[must_use]
    pub const fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Returns the training configuration.
    #[must_use]
    pub const fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Creates initial training state.
    #[must_use]
    pub const fn initial_state(&self) -> TrainingState {
        TrainingState::from_config(&self.config)
    }

    /// Computes the scheduled learning rate for an epoch.
    #[must_use]
    pub fn compute_lr(&self, epoch: usize) -> f64 {
        self.config
            .lr_schedule
            .compute_lr(self.config.optimizer.learning_rate, epoch)
    }

    /// Computes the number of batches for a dataset size.
    #[must_use]
    pub const fn num_batches(&self, dataset_size: usize) -> usize {
        if self.config.batch_size == 0 {
            0
        } else {
            dataset_size.div_ceil(self.config.batch_size)
        }
    }

    /// Gets batch indices for a given batch number.
    ///
    /// Returns (start, end) indices into the dataset.
    #[must_use]
    pub fn batch_indices(&self, batch: usize, dataset_size: usize) -> (usize, usize) {
        let start = batch * self.config.batch_size;
        let end = ((batch + 1) * self.config.batch_size).min(dataset_size);
        (start, end)
    }

    /// Runs the full training loop.
    ///
    /// Blocking; returns after all epochs complete, a callback requests a
    /// stop, or the first error. Validation is skipped when `val` is
    /// empty, in which case accuracy-driven callbacks never fire.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] for a bad configuration,
    /// [`TrainingError::Dataset`] for an empty training set, and batch or
    /// checkpoint errors from inside the loop.
    pub fn fit<B: AutodiffBackend>(
        &self,
        model: ImageClassifier<B>,
        train: &[ImageSample],
        val: &[ImageSample],
        callbacks: &mut CallbackList,
        device: &B::Device,
    ) -> Result<FitOutcome<B>> {
        if !self.config.is_valid() {
            return Err(TrainingError::invalid_config(
                "epochs, batch size and learning rate must all be positive",
            ));
        }
        if train.is_empty() {
            return Err(TrainingError::dataset("no training samples"));
        }

        let opt = &self.config.optimizer;
        match opt.optimizer_type {
            OptimizerType::Sgd | OptimizerType::SgdMomentum => {
                let mut sgd = SgdConfig::new();
                if opt.momentum > 0.0 {
                    sgd = sgd
                        .with_momentum(Some(MomentumConfig::new().with_momentum(opt.momentum)));
                }
                if opt.weight_decay > 0.0 {
                    sgd = sgd.with_weight_decay(Some(WeightDecayConfig::new(opt.weight_decay)));
                }
                self.run_loop(model, train, val, callbacks, device, sgd.init())
            }
            OptimizerType::Adam => {
                let mut adam = AdamConfig::new()
                    .with_beta_1(opt.beta1)
                    .with_beta_2(opt.beta2)
                    .with_epsilon(opt.epsilon);
                if opt.weight_decay > 0.0 {
                    adam = adam.with_weight_decay(Some(WeightDecayConfig::new(opt.weight_decay)));
                }
                self.run_loop(model, train, val, callbacks, device, adam.init())
            }
        }
    }

    #[allow(clippy::too_many_lines, clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn run_loop<B, O>(
        &self,
        mut model: ImageClassifier<B>,
        train: &[ImageSample],
        val: &[ImageSample],
        callbacks: &mut CallbackList,
        device: &B::Device,
        mut optim: O,
    ) -> Result<FitOutcome<B>>
    where
        B: AutodiffBackend,
        O: Optimizer<ImageClassifier<B>, B>,
    {
        let mut state = self.initial_state();
        let mut run = RunMetrics::new();
        let mut ctx = CallbackContext::new(self.config.epochs, self.config.optimizer.learning_rate);
        let mut checkpoint = None;

        info!(
            epochs = self.config.epochs,
            batch_size = self.config.batch_size,
            train_samples = train.len(),
            val_samples = val.len(),
            num_workers = self.config.num_workers,
            freeze_backbone = self.config.freeze_backbone,
            "starting training run"
        );

        let begin_action = callbacks.on_train_begin(&mut ctx);

        if self.config.freeze_backbone {
            model = model.freeze_backbone();
            info!("backbone frozen; only the head will train");
        }

        let mut rng = self
            .config
            .seed
            .map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);

        let train_batcher = ImageBatcher::<B>::new(device.clone());
        let val_batcher = ImageBatcher::<B::InnerBackend>::new(device.clone());
        let loss_fn: CrossEntropyLoss<B> = CrossEntropyLossConfig::new().init(device);
        let val_loss_fn: CrossEntropyLoss<B::InnerBackend> =
            CrossEntropyLossConfig::new().init(device);

        let mut indices: Vec<usize> = (0..train.len()).collect();

        if begin_action == CallbackAction::Stop {
            run.set_stopped_early("callback stop before first epoch");
            state.finished = true;
        }

        while !state.is_finished() {
            let epoch = state.epoch;

            // The configured schedule takes precedence; under a Constant
            // schedule the context's rate persists so callbacks like
            // StepLr can drive it instead.
            let lr = match self.config.lr_schedule {
                LearningRateSchedule::Constant => ctx.lr,
                schedule => schedule.compute_lr(self.config.optimizer.learning_rate, epoch),
            };
            ctx.lr = lr;

            // Train pass.
            let train_start = Instant::now();
            if self.config.shuffle {
                indices.shuffle(&mut rng);
            }

            let mut loss_sum = 0.0_f64;
            let mut seen = 0_usize;
            for batch_idx in 0..self.num_batches(train.len()) {
                let (start, end) = self.batch_indices(batch_idx, train.len());
                let refs: Vec<&ImageSample> =
                    indices[start..end].iter().map(|&i| &train[i]).collect();
                let (images, targets) = train_batcher.batch(&refs)?;

                let logits = model.forward(images);
                let loss = loss_fn.forward(logits, targets);
                loss_sum += loss.clone().into_scalar().elem::<f64>() * (end - start) as f64;
                seen += end - start;

                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optim.step(lr, model, grads);
            }
            let train_loss = (loss_sum / seen.max(1) as f64) as f32;
            let train_time = train_start.elapsed().as_secs_f32();

            // Validation pass on the inner backend, no gradient tracking.
            let mut val_loss = None;
            let mut val_accuracy = None;
            let mut val_time = None;
            if !val.is_empty() {
                let val_start = Instant::now();
                let valid_model = model.valid();

                let mut vloss_sum = 0.0_f64;
                let mut correct = 0_i64;
                let mut total = 0_usize;
                for batch_idx in 0..self.num_batches(val.len()) {
                    let (start, end) = self.batch_indices(batch_idx, val.len());
                    let refs: Vec<&ImageSample> = val[start..end].iter().collect();
                    let (images, targets) = val_batcher.batch(&refs)?;

                    let logits = valid_model.forward(images);
                    let loss = val_loss_fn.forward(logits.clone(), targets.clone());
                    vloss_sum += loss.into_scalar().elem::<f64>() * (end - start) as f64;

                    // argmax keeps the class dim as [batch, 1]; flatten
                    // to [batch] before comparing with the targets.
                    let predictions = logits.argmax(1).flatten::<1>(0, 1);
                    correct += predictions
                        .equal(targets)
                        .int()
                        .sum()
                        .into_scalar()
                        .elem::<i64>();
                    total += end - start;
                }

                val_loss = Some((vloss_sum / total.max(1) as f64) as f32);
                val_accuracy = Some(correct as f32 / total.max(1) as f32);
                val_time = Some(val_start.elapsed().as_secs_f32());
            }

            if let Some(accuracy) = val_accuracy {
                state.record_val_accuracy(accuracy);
            }

            info!(
                epoch,
                train_loss,
                val_loss = ?val_loss,
                val_accuracy = ?val_accuracy,
                lr,
                "epoch complete"
            );

            let mut epoch_metrics = EpochMetrics::new(epoch, train_loss, val_loss)
                .with_learning_rate(lr)
                .with_train_time(train_time)
                .with_samples(seen, (!val.is_empty()).then_some(val.len()));
            if let Some(accuracy) = val_accuracy {
                epoch_metrics = epoch_metrics.with_val_accuracy(accuracy);
            }
            if let Some(secs) = val_time {
                epoch_metrics = epoch_metrics.with_val_time(secs);
            }
            run.add_epoch(epoch_metrics);

            // Callback dispatch, then any requested checkpoint save. The
            // trainer owns the model, so the save happens here.
            ctx.epoch = epoch;
            ctx.train_loss = train_loss;
            ctx.val_loss = val_loss;
            ctx.val_accuracy = val_accuracy;
            let action = callbacks.on_epoch_end(&mut ctx);

            if ctx.save_requested {
                let path = save_checkpoint(
                    &model,
                    &self.config.checkpoint_path,
                    CheckpointFormat::Binary,
                )?;
                debug!(path = %path.display(), epoch, "checkpoint saved");
                checkpoint = Some(path);
                ctx.save_requested = false;
            }

            state.next_epoch();
            if action == CallbackAction::Stop {
                run.set_stopped_early(format!("callback stop after epoch {epoch}"));
                state.finished = true;
            }
        }

        callbacks.on_train_end(&ctx);
        info!(
            epochs = run.epochs_completed(),
            best_val_accuracy = ?run.best_val_accuracy,
            "training run finished"
        );

        Ok(FitOutcome {
            model,
            metrics: run,
            checkpoint,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::callback::{BestCheckpoint, Callback};
    use burn::backend::Autodiff;
    use burn::prelude::Backend;
    use burn::tensor::Tensor;
    use burn_ndarray::NdArray;
    use ft_models::ImageClassifierConfig;
    use tempfile::TempDir;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn device() -> <TestBackend as Backend>::Device {
        <TestBackend as Backend>::Device::default()
    }

    fn small_model() -> ImageClassifier<TestBackend> {
        let config = ImageClassifierConfig::new(2).with_channels([4, 4, 8, 8]);
        ImageClassifier::new(config, &device())
    }

    /// Two visually distinct classes: dark and bright 8x8 squares.
    fn synthetic_samples() -> Vec<ImageSample> {
        let mut samples = Vec::new();
        for (label, fill) in [(0_usize, 0.2_f32), (1, 0.8)] {
            for jitter in [0.0_f32, 0.05] {
                samples.push(ImageSample::new(
                    vec![fill + jitter; 3 * 8 * 8],
                    8,
                    8,
                    label,
                ));
            }
        }
        samples
    }

    struct StopAfterFirstEpoch;

    impl Callback for StopAfterFirstEpoch {
        fn on_epoch_end(&mut self, _ctx: &mut CallbackContext) -> CallbackAction {
            CallbackAction::Stop
        }
    }

    #[test]
    fn training_state_new() {
        let state = TrainingState::new();
        assert_eq!(state.epoch, 0);
        assert!(!state.is_finished());
        assert!(state.best_val_accuracy.is_none());
    }

    #[test]
    fn training_state_from_config() {
        let config = TrainingConfig::new(50);
        let state = TrainingState::from_config(&config);
        assert_eq!(state.total_epochs, 50);
    }

    #[test]
    fn training_state_progress() {
        let mut state = TrainingState::new();
        state.total_epochs = 10;

        assert!(state.progress().abs() < 1e-6);
        state.epoch = 5;
        assert!((state.progress() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn training_state_next_epoch() {
        let mut state = TrainingState::new();
        state.total_epochs = 2;

        state.next_epoch();
        assert_eq!(state.epoch, 1);
        assert!(!state.is_finished());

        state.next_epoch();
        assert!(state.is_finished());
    }

    #[test]
    fn training_state_record_accuracy_strict() {
        let mut state = TrainingState::new();

        assert!(state.record_val_accuracy(0.80));
        assert!(!state.record_val_accuracy(0.75));
        assert!(state.record_val_accuracy(0.90));
        assert!(!state.record_val_accuracy(0.90)); // tie is not an improvement
        assert_eq!(state.best_val_accuracy, Some(0.90));
    }

    #[test]
    fn trainer_compute_lr_from_schedule() {
        let config = TrainingConfig::new(25).with_lr_schedule(LearningRateSchedule::step(0.1, 7));
        let trainer = Trainer::new(config);

        assert!((trainer.compute_lr(0) - 1e-3).abs() < 1e-12);
        assert!((trainer.compute_lr(7) - 1e-4).abs() < 1e-12);
        assert!((trainer.compute_lr(14) - 1e-5).abs() < 1e-12);
    }

    #[test]
    fn trainer_num_batches() {
        let trainer = Trainer::new(TrainingConfig::new(10).with_batch_size(32));

        assert_eq!(trainer.num_batches(100), 4);
        assert_eq!(trainer.num_batches(32), 1);
        assert_eq!(trainer.num_batches(33), 2);
        assert_eq!(trainer.num_batches(0), 0);
    }

    #[test]
    fn trainer_batch_indices() {
        let trainer = Trainer::new(TrainingConfig::new(10).with_batch_size(32));

        assert_eq!(trainer.batch_indices(0, 100), (0, 32));
        assert_eq!(trainer.batch_indices(1, 100), (32, 64));
        assert_eq!(trainer.batch_indices(3, 100), (96, 100)); // partial last batch
    }

    #[test]
    fn fit_rejects_invalid_config() {
        let mut config = TrainingConfig::new(1);
        config.epochs = 0;
        let trainer = Trainer::new(config);
        let samples = synthetic_samples();
        let mut callbacks = CallbackList::new();

        let result = trainer.fit(small_model(), &samples, &samples, &mut callbacks, &device());
        assert!(matches!(result, Err(TrainingError::InvalidConfig(_))));
    }

    #[test]
    fn fit_rejects_empty_training_set() {
        let trainer = Trainer::new(TrainingConfig::new(1));
        let mut callbacks = CallbackList::new();

        let result = trainer.fit(small_model(), &[], &[], &mut callbacks, &device());
        assert!(matches!(result, Err(TrainingError::Dataset(_))));
    }

    #[test]
    fn fit_one_epoch_produces_checkpoint() {
        let dir = TempDir::new().unwrap();
        let config = TrainingConfig::new(1)
            .with_batch_size(2)
            .with_checkpoint_path(dir.path().join("best"))
            .with_seed(42);
        let trainer = Trainer::new(config);

        let samples = synthetic_samples();
        let mut callbacks = CallbackList::new();
        callbacks.push(BestCheckpoint::new());

        let outcome = trainer
            .fit(small_model(), &samples, &samples, &mut callbacks, &device())
            .unwrap();

        assert_eq!(outcome.metrics.epochs_completed(), 1);
        assert!(outcome.metrics.best_val_accuracy.is_some());

        // First observed accuracy always beats the initial best of None.
        let path = outcome.checkpoint.unwrap();
        assert!(path.exists());
    }

    #[test]
    fn fit_without_validation_skips_accuracy() {
        let dir = TempDir::new().unwrap();
        let config = TrainingConfig::new(1)
            .with_batch_size(2)
            .with_checkpoint_path(dir.path().join("best"))
            .with_seed(42);
        let trainer = Trainer::new(config);

        let samples = synthetic_samples();
        let mut callbacks = CallbackList::new();
        callbacks.push(BestCheckpoint::new());

        let outcome = trainer
            .fit(small_model(), &samples, &[], &mut callbacks, &device())
            .unwrap();

        assert_eq!(outcome.metrics.epochs_completed(), 1);
        assert!(outcome.metrics.best_val_accuracy.is_none());
        assert!(outcome.checkpoint.is_none());
    }

    #[test]
    fn fit_honors_callback_stop() {
        let config = TrainingConfig::new(5).with_batch_size(2).with_seed(0);
        let trainer = Trainer::new(config);

        let samples = synthetic_samples();
        let mut callbacks = CallbackList::new();
        callbacks.push(StopAfterFirstEpoch);

        let outcome = trainer
            .fit(small_model(), &samples, &samples, &mut callbacks, &device())
            .unwrap();

        assert_eq!(outcome.metrics.epochs_completed(), 1);
        assert!(outcome.metrics.stopped_early);
    }

    #[test]
    fn fit_with_frozen_backbone_trains_only_head() {
        let config = TrainingConfig::new(1)
            .with_batch_size(2)
            .with_frozen_backbone()
            .with_seed(7);
        let trainer = Trainer::new(config);

        let model = small_model();
        let input = Tensor::<TestBackend, 4>::ones([1, 3, 8, 8], &device());
        let features_before: Vec<f32> = model
            .features(input.clone())
            .into_data()
            .to_vec()
            .unwrap();
        let logits_before: Vec<f32> = model
            .forward(input.clone())
            .into_data()
            .to_vec()
            .unwrap();

        let samples = synthetic_samples();
        let mut callbacks = CallbackList::new();
        let outcome = trainer
            .fit(model, &samples, &samples, &mut callbacks, &device())
            .unwrap();

        // Backbone parameters bit-unchanged, head updated.
        let features_after: Vec<f32> = outcome
            .model
            .features(input.clone())
            .into_data()
            .to_vec()
            .unwrap();
        let logits_after: Vec<f32> = outcome.model.forward(input).into_data().to_vec().unwrap();
        assert_eq!(features_before, features_after);
        assert_ne!(logits_before, logits_after);
    }

    #[test]
    fn fit_with_adam_optimizer_runs() {
        let config = TrainingConfig::new(1)
            .with_batch_size(2)
            .with_optimizer(crate::config::OptimizerConfig::adam(1e-3).with_weight_decay(1e-4))
            .with_seed(1);
        let trainer = Trainer::new(config);

        let samples = synthetic_samples();
        let mut callbacks = CallbackList::new();
        let outcome = trainer
            .fit(small_model(), &samples, &samples, &mut callbacks, &device())
            .unwrap();

        assert_eq!(outcome.metrics.epochs_completed(), 1);
    }

    #[test]
    fn training_state_serialization() {
        let state = TrainingState::new();
        let json = serde_json::to_string(&state);
        assert!(json.is_ok());

        let parsed: std::result::Result<TrainingState, _> =
            serde_json::from_str(&json.unwrap_or_default());
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap_or_default(), state);
    }
}
