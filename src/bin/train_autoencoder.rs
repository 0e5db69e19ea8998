//! Digit autoencoder.
//!
//! Trains the class-code autoencoder on a labelled-pixel CSV, then feeds a
//! one-hot code scaled by 10 for each digit through the decoder alone and
//! writes the results as `Output_<digit>.png`.

use anyhow::{Context, Result};
use burn::module::AutodiffModule;
use burn::tensor::backend::Backend;
use clap::Parser;
use nnplay::checkpoint::{load_module, save_module};
use nnplay::data::ImageDataset;
use nnplay::model::{init_device, AutoencoderConfig, InferBackend, TrainBackend};
use nnplay::training::digits::{
    decode_class_codes, reconstruction_error, save_class_images, train_autoencoder,
    AutoencoderTrainConfig,
};
use nnplay::utils::init_tracing;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nnplay-autoencoder",
    about = "Train a digit autoencoder and render one image per class code"
)]
struct Args {
    /// Training CSV: label,p0,...,p783 with 0-255 pixels
    #[arg(long, default_value = "data/digits/train.csv")]
    train: PathBuf,

    /// Directory receiving Output_<digit>.png
    #[arg(long, default_value = "data/output")]
    output_dir: PathBuf,

    /// Model path stem
    #[arg(long, default_value = "data/models/autoencoder")]
    model: PathBuf,

    /// Load the model from --model instead of training
    #[arg(long)]
    restore: bool,

    #[arg(long, default_value_t = 3)]
    epochs: usize,

    #[arg(long, default_value_t = 128)]
    batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    learning_rate: f64,

    /// Weight of the code cross-entropy term
    #[arg(long, default_value_t = 0.1)]
    code_weight: f32,

    /// Scale of the one-hot codes fed to the decoder
    #[arg(long, default_value_t = 10.0)]
    code_scale: f32,

    /// Seed for weight initialization and shuffling
    #[arg(long, default_value_t = 12345)]
    seed: u64,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let device = init_device();
    let model_config = AutoencoderConfig::new();

    let model = if args.restore {
        load_module(model_config.init::<InferBackend>(&device), &args.model, &device)
            .with_context(|| format!("restoring {}", args.model.display()))?
    } else {
        let train = ImageDataset::load_digits_csv(&args.train)
            .with_context(|| format!("loading {}", args.train.display()))?;

        TrainBackend::seed(args.seed);
        let model = model_config.init::<TrainBackend>(&device);
        let config = AutoencoderTrainConfig {
            epochs: args.epochs,
            batch_size: args.batch_size,
            learning_rate: args.learning_rate,
            code_weight: args.code_weight,
            seed: args.seed,
        };
        let (model, _) = train_autoencoder(model, &train, &config, &device)?;
        let mse = reconstruction_error(&model, &train, args.batch_size, &device)?;
        tracing::info!(mse, "training set reconstruction error");

        let model = model.valid();
        save_module(model.clone(), &args.model)
            .with_context(|| format!("saving {}", args.model.display()))?;
        model
    };

    let images = decode_class_codes(&model, args.code_scale, &device)?;
    save_class_images(&images, &args.output_dir)?;
    Ok(())
}
