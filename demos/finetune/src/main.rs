//! Fine-tune an image classifier on a downloaded dataset.
//!
//! Downloads and extracts an image-folder dataset (ants vs. bees by
//! default), then fine-tunes a classifier with SGD + momentum, stepped
//! learning-rate decay and best-accuracy checkpointing:
//!
//! ```text
//! cargo run --release -p finetune -- --epochs 25 --freeze
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use ft_dataset::{DatasetPreparer, ImageFolder, TransformPipeline};
use ft_models::{ImageClassifier, ImageClassifierConfig};
use ft_training::{
    BestCheckpoint, Callback, CallbackAction, CallbackContext, CallbackList, OptimizerConfig,
    StepLr, Trainer, TrainingConfig,
};

type B = Autodiff<NdArray<f32>>;

const HYMENOPTERA_URL: &str = "https://download.pytorch.org/tutorial/hymenoptera_data.zip";

#[derive(Parser)]
#[command(name = "finetune")]
#[command(about = "Fine-tune an image classifier on a downloaded dataset")]
#[command(version)]
struct Args {
    /// Directory where datasets are downloaded and extracted
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// URL of the dataset zip archive (image-folder layout with train/ and val/)
    #[arg(long, default_value = HYMENOPTERA_URL)]
    dataset_url: String,

    /// Number of training epochs
    #[arg(long, default_value_t = 25)]
    epochs: usize,

    /// Samples per batch
    #[arg(long, default_value_t = 4)]
    batch_size: usize,

    /// Initial learning rate
    #[arg(long, default_value_t = 1e-3)]
    learning_rate: f64,

    /// SGD momentum
    #[arg(long, default_value_t = 0.9)]
    momentum: f64,

    /// Epochs between learning-rate decays
    #[arg(long, default_value_t = 7)]
    step_size: usize,

    /// Learning-rate decay factor
    #[arg(long, default_value_t = 0.1)]
    gamma: f64,

    /// Side length images are cropped to
    #[arg(long, default_value_t = 224)]
    image_size: u32,

    /// Pretrained checkpoint to fine-tune from
    #[arg(long)]
    pretrained: Option<PathBuf>,

    /// Number of classes in the pretrained checkpoint's head
    #[arg(long, default_value_t = 1000)]
    pretrained_classes: usize,

    /// Path stem for the best-model checkpoint
    #[arg(long, default_value = "checkpoints/best")]
    checkpoint: PathBuf,

    /// Seed for shuffling and augmentation
    #[arg(long)]
    seed: Option<u64>,

    /// Train only the classifier head
    #[arg(long)]
    freeze: bool,
}

/// Advances a progress bar at each epoch boundary.
struct EpochProgress {
    bar: ProgressBar,
}

impl Callback for EpochProgress {
    fn on_epoch_end(&mut self, ctx: &mut CallbackContext) -> CallbackAction {
        let accuracy = ctx
            .val_accuracy
            .map_or_else(|| "n/a".to_string(), |a| format!("{a:.4}"));
        self.bar.set_message(format!(
            "loss {:.4}  val acc {}  lr {:.0e}",
            ctx.train_loss, accuracy, ctx.lr
        ));
        self.bar.inc(1);
        CallbackAction::Continue
    }

    fn on_train_end(&mut self, _ctx: &CallbackContext) {
        self.bar.finish();
    }

    fn name(&self) -> &str {
        "EpochProgress"
    }
}

/// Derives the archive file name and extracted directory name from a URL.
fn dataset_names(url: &str) -> Result<(String, String)> {
    let archive = url
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .with_context(|| format!("cannot derive an archive name from {url}"))?;
    let extracted = archive.strip_suffix(".zip").unwrap_or(archive);
    Ok((archive.to_string(), extracted.to_string()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("finetune=info".parse()?)
                .add_directive("ft_training=info".parse()?)
                .add_directive("ft_dataset=info".parse()?),
        )
        .init();

    let args = Args::parse();

    // Fetch and extract the dataset, then index the class folders.
    let (archive, extracted) = dataset_names(&args.dataset_url)?;
    let preparer = DatasetPreparer::new(&args.dataset_url, archive, extracted);
    let dataset_root = preparer
        .prepare(&args.data_dir)
        .context("preparing dataset")?;

    let train_folder =
        ImageFolder::from_dir(dataset_root.join("train")).context("indexing train split")?;
    let val_folder =
        ImageFolder::from_dir(dataset_root.join("val")).context("indexing val split")?;
    if train_folder.classes() != val_folder.classes() {
        bail!(
            "train and val splits disagree on classes: {:?} vs {:?}",
            train_folder.classes(),
            val_folder.classes()
        );
    }
    info!(
        classes = ?train_folder.classes(),
        train = train_folder.len(),
        val = val_folder.len(),
        "dataset ready"
    );

    // Decode everything up front; the dataset is small enough to hold.
    let mut rng = args
        .seed
        .map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
    let train_samples =
        train_folder.load_all(&TransformPipeline::train_preset(args.image_size), &mut rng)?;
    let val_samples =
        val_folder.load_all(&TransformPipeline::eval_preset(args.image_size), &mut rng)?;

    let device = NdArrayDevice::default();
    let num_classes = train_folder.num_classes();
    let model: ImageClassifier<B> = match &args.pretrained {
        Some(path) => {
            info!(path = %path.display(), "loading pretrained weights");
            ImageClassifier::from_pretrained(
                ImageClassifierConfig::new(args.pretrained_classes),
                path,
                num_classes,
                &device,
            )?
        }
        None => ImageClassifier::new(ImageClassifierConfig::new(num_classes), &device),
    };

    // The schedule stays Constant so the StepLr callback drives decay.
    let mut config = TrainingConfig::new(args.epochs)
        .with_batch_size(args.batch_size)
        .with_optimizer(OptimizerConfig::sgd_momentum(
            args.learning_rate,
            args.momentum,
        ))
        .with_checkpoint_path(args.checkpoint.clone());
    if args.freeze {
        config = config.with_frozen_backbone();
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let bar = ProgressBar::new(args.epochs as u64);
    bar.set_style(ProgressStyle::with_template(
        " {spinner:.green} [Epoch {pos}/{len}] {wide_msg}",
    )?);

    let mut callbacks = CallbackList::new();
    callbacks.push(StepLr::new(args.step_size, args.gamma));
    callbacks.push(BestCheckpoint::new());
    callbacks.push(EpochProgress { bar });

    let trainer = Trainer::new(config);
    let outcome = trainer
        .fit(model, &train_samples, &val_samples, &mut callbacks, &device)
        .context("training failed")?;

    println!("{}", outcome.metrics.summary());
    match outcome.checkpoint {
        Some(path) => println!("Best model saved to {}", path.display()),
        None => println!("No checkpoint was saved (no validation improvement observed)"),
    }

    Ok(())
}
