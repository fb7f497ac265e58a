//! Callback hooks for training events.
//!
//! Callbacks observe the training loop at epoch boundaries through a
//! mutable [`CallbackContext`]. They never touch the model directly: a
//! callback that wants a checkpoint written sets `save_requested` and the
//! trainer, which owns the model, performs the save.

/// Mutable training state handed to callbacks at epoch boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackContext {
    /// Epoch that just finished (0-indexed).
    pub epoch: usize,

    /// Total epochs planned.
    pub total_epochs: usize,

    /// Learning rate in effect. Callbacks may mutate this to adjust the
    /// rate used for subsequent epochs.
    pub lr: f64,

    /// Mean training loss of the finished epoch.
    pub train_loss: f32,

    /// Mean validation loss, if a validation pass ran.
    pub val_loss: Option<f32>,

    /// Validation accuracy in `[0, 1]`, if a validation pass ran.
    pub val_accuracy: Option<f32>,

    /// Best monitored metric seen so far.
    pub best_metric: Option<f32>,

    /// Set by a callback to request a checkpoint save. The trainer
    /// performs the save and clears the flag.
    pub save_requested: bool,
}

impl CallbackContext {
    /// Creates a context for a run of `total_epochs` starting at `lr`.
    #[must_use]
    pub const fn new(total_epochs: usize, lr: f64) -> Self {
        Self {
            epoch: 0,
            total_epochs,
            lr,
            train_loss: 0.0,
            val_loss: None,
            val_accuracy: None,
            best_metric: None,
            save_requested: false,
        }
    }
}

/// Action requested by a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue training normally.
    Continue,
    /// Stop training after this epoch.
    Stop,
}

/// Observer of training events.
///
/// All methods have default no-op implementations; implement only the
/// events you care about.
///
/// # Example
///
/// ```
/// use ft_training::{Callback, CallbackAction, CallbackContext};
///
/// struct PrintProgress;
///
/// impl Callback for PrintProgress {
///     fn on_epoch_end(&mut self, ctx: &mut CallbackContext) -> CallbackAction {
///         println!("epoch {} loss {:.4}", ctx.epoch, ctx.train_loss);
///         CallbackAction::Continue
///     }
/// }
/// ```
pub trait Callback: Send {
    /// Called once before the first epoch.
    fn on_train_begin(&mut self, _ctx: &mut CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after each epoch's train and validation passes.
    fn on_epoch_end(&mut self, _ctx: &mut CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called once after the last epoch (or after a stop).
    fn on_train_end(&mut self, _ctx: &CallbackContext) {}

    /// Callback name for logging.
    fn name(&self) -> &str {
        "Callback"
    }
}

/// An ordered list of callbacks dispatched in registration order.
#[derive(Default)]
pub struct CallbackList {
    callbacks: Vec<Box<dyn Callback>>,
}

impl std::fmt::Debug for CallbackList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.callbacks.iter().map(|c| c.name()).collect();
        f.debug_struct("CallbackList").field("callbacks", &names).finish()
    }
}

impl CallbackList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a callback. Dispatch follows registration order.
    pub fn push(&mut self, callback: impl Callback + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    /// Returns the number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Returns `true` if no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Dispatches `on_train_begin`. Any `Stop` wins.
    pub fn on_train_begin(&mut self, ctx: &mut CallbackContext) -> CallbackAction {
        let mut action = CallbackAction::Continue;
        for callback in &mut self.callbacks {
            if callback.on_train_begin(ctx) == CallbackAction::Stop {
                action = CallbackAction::Stop;
            }
        }
        action
    }

    /// Dispatches `on_epoch_end`. Any `Stop` wins.
    pub fn on_epoch_end(&mut self, ctx: &mut CallbackContext) -> CallbackAction {
        let mut action = CallbackAction::Continue;
        for callback in &mut self.callbacks {
            if callback.on_epoch_end(ctx) == CallbackAction::Stop {
                action = CallbackAction::Stop;
            }
        }
        action
    }

    /// Dispatches `on_train_end`.
    pub fn on_train_end(&mut self, ctx: &CallbackContext) {
        for callback in &mut self.callbacks {
            callback.on_train_end(ctx);
        }
    }
}

/// Step decay of the learning rate.
///
/// Every `step_size` completed epochs, multiplies the context's learning
/// rate by `gamma`. Deterministic and metric-independent.
///
/// # Example
///
/// ```
/// use ft_training::StepLr;
///
/// // Decay by 10x every 7 epochs, the standard fine-tuning schedule.
/// let step_lr = StepLr::new(7, 0.1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepLr {
    step_size: usize,
    gamma: f64,
}

impl StepLr {
    /// Creates a step decay with the given period and factor.
    #[must_use]
    pub const fn new(step_size: usize, gamma: f64) -> Self {
        Self { step_size, gamma }
    }
}

impl Callback for StepLr {
    fn on_epoch_end(&mut self, ctx: &mut CallbackContext) -> CallbackAction {
        if self.step_size > 0 && (ctx.epoch + 1) % self.step_size == 0 {
            ctx.lr *= self.gamma;
        }
        CallbackAction::Continue
    }

    fn name(&self) -> &str {
        "StepLr"
    }
}

/// Checkpoint-on-improvement policy.
///
/// Tracks the best validation accuracy seen and requests a save whenever
/// the current epoch strictly beats it. Ties do not save, so the kept
/// checkpoint is always the earliest epoch attaining the best accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BestCheckpoint {
    best: Option<f32>,
}

impl BestCheckpoint {
    /// Creates a tracker with no observed accuracy yet.
    ///
    /// The first observation always counts as an improvement.
    #[must_use]
    pub const fn new() -> Self {
        Self { best: None }
    }

    /// Returns the best accuracy observed so far.
    #[must_use]
    pub const fn best(&self) -> Option<f32> {
        self.best
    }
}

impl Callback for BestCheckpoint {
    fn on_epoch_end(&mut self, ctx: &mut CallbackContext) -> CallbackAction {
        if let Some(accuracy) = ctx.val_accuracy {
            let improved = self.best.map_or(true, |best| accuracy > best);
            if improved {
                self.best = Some(accuracy);
                ctx.best_metric = Some(accuracy);
                ctx.save_requested = true;
            }
        }
        CallbackAction::Continue
    }

    fn name(&self) -> &str {
        "BestCheckpoint"
    }
}
