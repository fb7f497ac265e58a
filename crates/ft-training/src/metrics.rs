//! Training metrics and run summaries.

use serde::{Deserialize, Serialize};

/// Metrics for a single training epoch.
///
/// # Example
///
/// ```
/// use ft_training::EpochMetrics;
///
/// let metrics = EpochMetrics::new(0, 0.5, Some(0.4)).with_val_accuracy(0.85);
/// assert_eq!(metrics.epoch, 0);
/// assert_eq!(metrics.val_accuracy, Some(0.85));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Epoch number (0-indexed).
    pub epoch: usize,

    /// Mean training loss for this epoch.
    pub train_loss: f32,

    /// Mean validation loss (if computed).
    pub val_loss: Option<f32>,

    /// Validation accuracy in `[0, 1]` (if computed).
    pub val_accuracy: Option<f32>,

    /// Learning rate used for this epoch.
    pub learning_rate: f64,

    /// Training time in seconds.
    pub train_time_secs: f32,

    /// Validation time in seconds.
    pub val_time_secs: Option<f32>,

    /// Number of training samples processed.
    pub train_samples: usize,

    /// Number of validation samples processed.
    pub val_samples: Option<usize>,
}

impl EpochMetrics {
    /// Creates new epoch metrics.
    #[must_use]
    pub const fn new(epoch: usize, train_loss: f32, val_loss: Option<f32>) -> Self {
        Self {
            epoch,
            train_loss,
            val_loss,
            val_accuracy: None,
            learning_rate: 0.0,
            train_time_secs: 0.0,
            val_time_secs: None,
            train_samples: 0,
            val_samples: None,
        }
    }

    /// Sets the validation accuracy.
    #[must_use]
    pub const fn with_val_accuracy(mut self, accuracy: f32) -> Self {
        self.val_accuracy = Some(accuracy);
        self
    }

    /// Sets the learning rate.
    #[must_use]
    pub const fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Sets the training time.
    #[must_use]
    pub const fn with_train_time(mut self, secs: f32) -> Self {
        self.train_time_secs = secs;
        self
    }

    /// Sets the validation time.
    #[must_use]
    pub const fn with_val_time(mut self, secs: f32) -> Self {
        self.val_time_secs = Some(secs);
        self
    }

    /// Sets sample counts.
    #[must_use]
    pub const fn with_samples(mut self, train: usize, val: Option<usize>) -> Self {
        self.train_samples = train;
        self.val_samples = val;
        self
    }

    /// Returns total time (train + val) in seconds.
    #[must_use]
    pub fn total_time_secs(&self) -> f32 {
        self.train_time_secs + self.val_time_secs.unwrap_or(0.0)
    }
}

/// Aggregate metrics for a training run.
///
/// # Example
///
/// ```
/// use ft_training::{EpochMetrics, RunMetrics};
///
/// let mut metrics = RunMetrics::new();
/// metrics.add_epoch(EpochMetrics::new(0, 0.5, Some(0.4)).with_val_accuracy(0.7));
/// metrics.add_epoch(EpochMetrics::new(1, 0.3, Some(0.35)).with_val_accuracy(0.9));
///
/// assert_eq!(metrics.epochs_completed(), 2);
/// assert_eq!(metrics.best_val_accuracy, Some(0.9));
/// assert_eq!(metrics.best_epoch, Some(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Metrics for each epoch.
    pub epoch_metrics: Vec<EpochMetrics>,

    /// Best validation accuracy seen.
    pub best_val_accuracy: Option<f32>,

    /// Epoch with the best validation accuracy.
    pub best_epoch: Option<usize>,

    /// Total training time in seconds.
    pub total_time_secs: f32,

    /// Whether a callback stopped the run before all epochs.
    pub stopped_early: bool,

    /// Reason for stopping (if not completed normally).
    pub stop_reason: Option<String>,
}

impl RunMetrics {
    /// Creates new empty run metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds metrics for an epoch.
    ///
    /// The best accuracy tracker uses a strict `>` comparison, so the
    /// recorded best epoch is the earliest one attaining the best value.
    pub fn add_epoch(&mut self, metrics: EpochMetrics) {
        if let Some(accuracy) = metrics.val_accuracy {
            let improved = self
                .best_val_accuracy
                .map_or(true, |best| accuracy > best);
            if improved {
                self.best_val_accuracy = Some(accuracy);
                self.best_epoch = Some(metrics.epoch);
            }
        }

        self.total_time_secs += metrics.total_time_secs();
        self.epoch_metrics.push(metrics);
    }

    /// Returns the number of completed epochs.
    #[must_use]
    pub fn epochs_completed(&self) -> usize {
        self.epoch_metrics.len()
    }

    /// Returns the final training loss.
    #[must_use]
    pub fn final_loss(&self) -> f32 {
        self.epoch_metrics.last().map_or(f32::NAN, |m| m.train_loss)
    }

    /// Returns the final validation accuracy.
    #[must_use]
    pub fn final_val_accuracy(&self) -> Option<f32> {
        self.epoch_metrics.last().and_then(|m| m.val_accuracy)
    }

    /// Returns training losses as a vector.
    #[must_use]
    pub fn train_losses(&self) -> Vec<f32> {
        self.epoch_metrics.iter().map(|m| m.train_loss).collect()
    }

    /// Returns validation accuracies as a vector.
    #[must_use]
    pub fn val_accuracies(&self) -> Vec<Option<f32>> {
        self.epoch_metrics.iter().map(|m| m.val_accuracy).collect()
    }

    /// Returns learning rates as a vector.
    #[must_use]
    pub fn learning_rates(&self) -> Vec<f64> {
        self.epoch_metrics.iter().map(|m| m.learning_rate).collect()
    }

    /// Marks the run as stopped by a callback.
    pub fn set_stopped_early(&mut self, reason: impl Into<String>) {
        self.stopped_early = true;
        self.stop_reason = Some(reason.into());
    }

    /// Returns a human-readable summary.
    #[must_use]
    #[allow(clippy::let_underscore_must_use)] // String::write_fmt is infallible
    pub fn summary(&self) -> String {
        use std::fmt::Write;

        let mut s = String::new();
        let _ = writeln!(s, "Fine-Tuning Summary");
        let _ = writeln!(s, "===================");
        let _ = writeln!(s, "Epochs completed: {}", self.epochs_completed());
        let _ = writeln!(s, "Total time: {:.1}s", self.total_time_secs);
        let _ = writeln!(s, "Final train loss: {:.4}", self.final_loss());

        if let Some(best) = self.best_val_accuracy {
            let _ = writeln!(
                s,
                "Best val accuracy: {:.4} (epoch {})",
                best,
                self.best_epoch.unwrap_or(0)
            );
        }

        if self.stopped_early {
            let _ = writeln!(
                s,
                "Stopped early: {}",
                self.stop_reason.as_deref().unwrap_or("yes")
            );
        }

        s
    }
}
