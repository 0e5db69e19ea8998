//! Feed-forward digit classifier.
//!
//! Trains 784 -> 1000 ReLU -> 10 softmax on a labelled-pixel CSV and reports
//! accuracy, per-class statistics and the confusion matrix on a test CSV.

use anyhow::{Context, Result};
use burn::module::AutodiffModule;
use burn::tensor::backend::Backend;
use clap::Parser;
use nnplay::checkpoint::save_module;
use nnplay::data::ImageDataset;
use nnplay::model::{init_device, FeedForwardConfig, TrainBackend};
use nnplay::training::digits::{evaluate_classifier, train_classifier, ClassifierTrainConfig};
use nnplay::utils::init_tracing;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nnplay-digits",
    about = "Train and evaluate a feed-forward digit classifier"
)]
struct Args {
    /// Training CSV: label,p0,...,p783 with 0-255 pixels
    #[arg(long, default_value = "data/digits/train.csv")]
    train: PathBuf,

    /// Test CSV in the same format
    #[arg(long, default_value = "data/digits/test.csv")]
    test: PathBuf,

    /// Where to save the trained model (stem; optional)
    #[arg(long)]
    model: Option<PathBuf>,

    #[arg(long, default_value_t = 3)]
    epochs: usize,

    #[arg(long, default_value_t = 128)]
    batch_size: usize,

    /// SGD learning rate
    #[arg(long, default_value_t = 0.006)]
    learning_rate: f64,

    /// Nesterov momentum
    #[arg(long, default_value_t = 0.9)]
    momentum: f64,

    /// L2 weight decay
    #[arg(long, default_value_t = 1e-4)]
    l2: f32,

    #[arg(long, default_value_t = 1000)]
    hidden_size: usize,

    /// Seed for weight initialization and shuffling
    #[arg(long, default_value_t = 12345)]
    seed: u64,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let device = init_device();

    let train = ImageDataset::load_digits_csv(&args.train)
        .with_context(|| format!("loading {}", args.train.display()))?;
    let test = ImageDataset::load_digits_csv(&args.test)
        .with_context(|| format!("loading {}", args.test.display()))?;

    TrainBackend::seed(args.seed);
    let model = FeedForwardConfig::new()
        .with_hidden_size(args.hidden_size)
        .init::<TrainBackend>(&device);

    let config = ClassifierTrainConfig {
        epochs: args.epochs,
        batch_size: args.batch_size,
        learning_rate: args.learning_rate,
        momentum: args.momentum,
        l2: args.l2,
        seed: args.seed,
    };
    let (model, _) = train_classifier(model, &train, &config, &device)?;
    let model = model.valid();

    let eval = evaluate_classifier(&model, &test, args.batch_size, &device)?;
    println!("{}", eval.stats());

    if let Some(stem) = &args.model {
        save_module(model, stem).with_context(|| format!("saving {}", stem.display()))?;
    }
    Ok(())
}
