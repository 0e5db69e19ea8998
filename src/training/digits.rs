//! Digit image drivers: feed-forward classifier and class-code autoencoder.
//!
//! Both train with mini-batches over an [`ImageDataset`] that is reshuffled
//! every epoch from a seeded RNG. The classifier uses SGD with Nesterov
//! momentum; the autoencoder uses Adam.

use burn::module::AutodiffModule;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::momentum::MomentumConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer, SgdConfig};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

use super::evaluation::Evaluation;
use crate::core::{NetError, NetResult};
use crate::data::image::{save_png, ImageDataset, DIGIT_HEIGHT, DIGIT_WIDTH};
use crate::model::convert::{ndarray2_to_tensor, tensor_to_ndarray2};
use crate::model::{Autoencoder, FeedForward};

/// Settings for [`train_classifier`].
#[derive(Debug, Clone)]
pub struct ClassifierTrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub momentum: f64,
    pub l2: f32,
    /// Seed for batch shuffling.
    pub seed: u64,
}

impl Default for ClassifierTrainConfig {
    fn default() -> Self {
        Self {
            epochs: 3,
            batch_size: 128,
            learning_rate: 0.006,
            momentum: 0.9,
            l2: 1e-4,
            seed: 12345,
        }
    }
}

/// Settings for [`train_autoencoder`].
#[derive(Debug, Clone)]
pub struct AutoencoderTrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Weight of the code cross-entropy next to the reconstruction error.
    pub code_weight: f32,
    pub seed: u64,
}

impl Default for AutoencoderTrainConfig {
    fn default() -> Self {
        Self {
            epochs: 3,
            batch_size: 128,
            learning_rate: 1e-3,
            code_weight: 0.1,
            seed: 12345,
        }
    }
}

fn check_dataset(data: &ImageDataset, input_size: usize, batch_size: usize) -> NetResult<()> {
    if data.is_empty() {
        return Err(NetError::InvalidConfig("empty training set".to_string()));
    }
    if batch_size == 0 {
        return Err(NetError::InvalidConfig("batch size must be positive".to_string()));
    }
    if data.image_dim() != input_size {
        return Err(NetError::ShapeMismatch(format!(
            "images have {} pixels, network expects {}",
            data.image_dim(),
            input_size
        )));
    }
    Ok(())
}

fn check_score(score: f64, epoch: usize) -> NetResult<()> {
    if score.is_finite() {
        Ok(())
    } else {
        Err(NetError::Training(format!(
            "non-finite score {score} in epoch {epoch}"
        )))
    }
}

/// Train the classifier with Nesterov-momentum SGD.
///
/// Returns the trained model and the mean loss of the last epoch.
///
/// # Errors
///
/// Returns an error for an empty or mismatched dataset, or when the loss
/// becomes non-finite.
#[allow(clippy::cast_precision_loss)]
pub fn train_classifier<B: AutodiffBackend>(
    mut model: FeedForward<B>,
    data: &ImageDataset,
    config: &ClassifierTrainConfig,
    device: &B::Device,
) -> NetResult<(FeedForward<B>, f64)> {
    check_dataset(data, model.input_size(), config.batch_size)?;

    let momentum = MomentumConfig::new()
        .with_momentum(config.momentum)
        .with_dampening(0.0)
        .with_nesterov(true);
    let mut optim = SgdConfig::new()
        .with_momentum(Some(momentum))
        .with_weight_decay(Some(WeightDecayConfig::new(config.l2)))
        .init::<B, FeedForward<B>>();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut last_loss = f64::NAN;

    for epoch in 1..=config.epochs {
        let mut total = 0.0;
        let batches = data.shuffled_batches(config.batch_size, &mut rng);
        let n_batches = batches.len();
        for batch in batches {
            let images = ndarray2_to_tensor::<B>(&batch.images, device);
            let targets = ndarray2_to_tensor::<B>(&batch.targets, device);
            let loss = model.loss(images, targets);
            let score = loss.clone().into_scalar().elem::<f64>();
            check_score(score, epoch)?;
            total += score;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(config.learning_rate, model, grads);
        }
        last_loss = total / n_batches as f64;
        tracing::info!(epoch, loss = last_loss, "classifier epoch complete");
    }

    Ok((model, last_loss))
}

/// Classify every image in `data` and tally the results.
///
/// # Errors
///
/// Returns an error if the dataset does not match the network.
pub fn evaluate_classifier<B: Backend>(
    model: &FeedForward<B>,
    data: &ImageDataset,
    batch_size: usize,
    device: &B::Device,
) -> NetResult<Evaluation> {
    check_dataset(data, model.input_size(), batch_size)?;
    let mut eval = Evaluation::new(data.num_classes);
    for batch in data.batches(batch_size) {
        let probs = model.predict(ndarray2_to_tensor::<B>(&batch.images, device));
        let probs = tensor_to_ndarray2(probs)?;
        eval.record_batch(&batch.labels, probs.view())?;
    }
    tracing::info!(
        examples = eval.total(),
        accuracy = eval.accuracy(),
        "evaluation complete"
    );
    Ok(eval)
}

/// Train the autoencoder with Adam on reconstruction error plus code
/// cross-entropy against the digit label.
///
/// Returns the trained model and the mean loss of the last epoch.
///
/// # Errors
///
/// Returns an error for an empty or mismatched dataset, or when the loss
/// becomes non-finite.
#[allow(clippy::cast_precision_loss)]
pub fn train_autoencoder<B: AutodiffBackend>(
    mut model: Autoencoder<B>,
    data: &ImageDataset,
    config: &AutoencoderTrainConfig,
    device: &B::Device,
) -> NetResult<(Autoencoder<B>, f64)> {
    check_dataset(data, model.input_size(), config.batch_size)?;
    if data.num_classes != model.code_size() {
        return Err(NetError::ShapeMismatch(format!(
            "{} classes for a code of size {}",
            data.num_classes,
            model.code_size()
        )));
    }

    let mut optim = AdamConfig::new().init::<B, Autoencoder<B>>();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut last_loss = f64::NAN;

    for epoch in 1..=config.epochs {
        let mut total = 0.0;
        let batches = data.shuffled_batches(config.batch_size, &mut rng);
        let n_batches = batches.len();
        for batch in batches {
            let images = ndarray2_to_tensor::<B>(&batch.images, device);
            let targets = ndarray2_to_tensor::<B>(&batch.targets, device);
            let loss = model.loss(images, targets, config.code_weight);
            let score = loss.clone().into_scalar().elem::<f64>();
            check_score(score, epoch)?;
            total += score;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(config.learning_rate, model, grads);
        }
        last_loss = total / n_batches as f64;
        tracing::info!(epoch, loss = last_loss, "autoencoder epoch complete");
    }

    Ok((model, last_loss))
}

/// Mean reconstruction error of the inference copy of an autoencoder.
///
/// # Errors
///
/// Returns an error if the dataset does not match the network.
#[allow(clippy::cast_precision_loss)]
pub fn reconstruction_error<B: AutodiffBackend>(
    model: &Autoencoder<B>,
    data: &ImageDataset,
    batch_size: usize,
    device: &B::Device,
) -> NetResult<f64> {
    check_dataset(data, model.input_size(), batch_size)?;
    let model = model.valid();
    let mut total = 0.0;
    for batch in data.batches(batch_size) {
        let images = ndarray2_to_tensor::<B::InnerBackend>(&batch.images, device);
        let (_, recon) = model.forward(images.clone());
        let sq: f64 = (recon - images).powf_scalar(2.0).sum().into_scalar().elem();
        total += sq;
    }
    Ok(total / (data.len() * data.image_dim()) as f64)
}

/// Run one-hot codes scaled by `scale` through the decoder, one row per
/// class.
///
/// # Errors
///
/// Returns an error if the decoded tensor cannot be read back.
pub fn decode_class_codes<B: Backend>(
    model: &Autoencoder<B>,
    scale: f32,
    device: &B::Device,
) -> NetResult<Array2<f32>> {
    let n = model.code_size();
    let codes = Array2::from_shape_fn((n, n), |(i, j)| if i == j { scale } else { 0.0 });
    tensor_to_ndarray2(model.decode(ndarray2_to_tensor::<B>(&codes, device)))
}

/// Write each row of `images` as `Output_<row>.png` under `dir`.
///
/// # Errors
///
/// Returns an error if a row is not a 28x28 image or a file cannot be
/// written.
pub fn save_class_images(images: &Array2<f32>, dir: &Path) -> NetResult<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(images.nrows());
    for (i, row) in images.rows().into_iter().enumerate() {
        let path = dir.join(format!("Output_{i}.png"));
        save_png(&path, row, DIGIT_WIDTH, DIGIT_HEIGHT)?;
        written.push(path);
    }
    tracing::info!(count = written.len(), dir = %dir.display(), "class images written");
    Ok(written)
}
