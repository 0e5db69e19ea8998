//! Training loops, monitoring and evaluation.
//!
//! - [`train_char_model`]: fixed-iteration Adam training of the LSTM with
//!   periodic score logging and text samples
//! - [`digits`]: digit classifier and autoencoder drivers
//! - [`evaluation`]: confusion matrix and classification statistics

pub mod digits;
pub mod evaluation;

pub use evaluation::Evaluation;

use burn::module::AutodiffModule;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::checkpoint::save_char_model;
use crate::core::{NetError, NetResult};
use crate::data::CharBatchSampler;
use crate::generation::{generate_text, GeneratorConfig};
use crate::model::convert::{mask_to_tensor, sequence_to_tensor};
use crate::model::{CharRnn, CharRnnConfig, RnnStepper};

/// Settings for [`train_char_model`].
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Number of optimization steps; one batch each.
    pub iterations: usize,
    pub learning_rate: f64,
    /// L2 penalty applied through the optimizer.
    pub l2: f32,
    /// Log the score every N iterations (0 = never).
    pub score_every: usize,
    /// Print a generated sample every N iterations, starting after the
    /// first (0 = never).
    pub sample_every: usize,
    /// Characters per monitoring sample.
    pub monitor_sample_size: usize,
    /// Seed of the RNG used for monitoring samples.
    pub sample_seed: u64,
    /// Save a checkpoint every N iterations (0 = never).
    pub checkpoint_every: usize,
    /// Stem for periodic checkpoints.
    pub checkpoint_path: Option<PathBuf>,
    /// JSONL file receiving `score` and `sample` events.
    pub metrics_file: Option<PathBuf>,
    pub generator: GeneratorConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            learning_rate: 0.005,
            l2: 1e-4,
            score_every: 10,
            sample_every: 10,
            monitor_sample_size: 100,
            sample_seed: 34_352_442,
            checkpoint_every: 0,
            checkpoint_path: None,
            metrics_file: None,
            generator: GeneratorConfig::default(),
        }
    }
}

/// Progress of one training step, handed to the caller's observer.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainEvent {
    Score { iteration: usize, score: f64 },
    Sample { iteration: usize, text: String },
}

fn is_due(iteration: usize, every: usize) -> bool {
    every > 0 && iteration % every == 0
}

/// Samples are counted from zero: after iterations 1, 1 + N, 1 + 2N and so on.
fn sample_due(iteration: usize, every: usize) -> bool {
    iteration > 0 && is_due(iteration - 1, every)
}

struct MetricsWriter {
    path: PathBuf,
    file: File,
}

impl MetricsWriter {
    fn open(path: &Path) -> NetResult<Self> {
        let io_err = |source| NetError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    fn write(&mut self, event: &serde_json::Value) -> NetResult<()> {
        writeln!(self.file, "{event}")
            .and_then(|()| self.file.flush())
            .map_err(|source| NetError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// Train the character model for `config.iterations` steps.
///
/// Returns the trained model and the score of the last batch.
///
/// Every iteration draws one batch from `sampler` with `rng`, scores it with
/// the masked cross-entropy and applies one Adam step. There is no early
/// stopping. Scores and monitoring samples are reported through `on_event`
/// (samples are also printed to stdout by the binaries that pass
/// [`print_event`]).
///
/// # Errors
///
/// Returns [`NetError::Training`] if the loss becomes non-finite, and
/// propagates I/O, generation and checkpoint errors. Any error aborts the run.
#[allow(clippy::too_many_arguments)]
pub fn train_char_model<B, R, F>(
    mut model: CharRnn<B>,
    model_config: &CharRnnConfig,
    sampler: &mut CharBatchSampler,
    rng: &mut R,
    config: &TrainerConfig,
    device: &B::Device,
    mut on_event: F,
) -> NetResult<(CharRnn<B>, f64)>
where
    B: AutodiffBackend,
    R: Rng + ?Sized,
    F: FnMut(&TrainEvent),
{
    let vocab = sampler.corpus().vocab.clone();
    if model.vocab_size() != vocab.size() {
        return Err(NetError::ShapeMismatch(format!(
            "model has {} classes but the corpus has {} characters",
            model.vocab_size(),
            vocab.size()
        )));
    }
    if config.learning_rate <= 0.0 || !config.learning_rate.is_finite() {
        return Err(NetError::InvalidConfig(format!(
            "learning rate must be positive, got {}",
            config.learning_rate
        )));
    }

    let mut optim = AdamConfig::new()
        .with_weight_decay(Some(WeightDecayConfig::new(config.l2)))
        .init::<B, CharRnn<B>>();
    let mut sample_rng = StdRng::seed_from_u64(config.sample_seed);
    let mut metrics = config
        .metrics_file
        .as_deref()
        .map(MetricsWriter::open)
        .transpose()?;

    tracing::info!(
        iterations = config.iterations,
        batch_size = sampler.batch_size(),
        seq_len = sampler.config().seq_len,
        vocab = vocab.size(),
        "starting training"
    );
    let start = Instant::now();
    let mut last_score = f64::NAN;

    for iteration in 1..=config.iterations {
        let batch = sampler.next_batch(rng);
        let scored_steps = batch.scored_steps();

        let features = sequence_to_tensor::<B>(&batch.features, device)
            * mask_to_tensor::<B>(&batch.feature_mask, device);
        let labels = sequence_to_tensor::<B>(&batch.labels, device);
        let mask = mask_to_tensor::<B>(&batch.label_mask, device);

        let loss = model.masked_loss(features, labels, mask, scored_steps);
        let score = loss.clone().into_scalar().elem::<f64>();
        if !score.is_finite() {
            return Err(NetError::Training(format!(
                "non-finite score {score} at iteration {iteration}"
            )));
        }

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(config.learning_rate, model, grads);
        last_score = score;

        if is_due(iteration, config.score_every) {
            tracing::info!(
                iteration,
                score,
                elapsed_s = start.elapsed().as_secs_f64(),
                "score"
            );
            if let Some(m) = metrics.as_mut() {
                m.write(&serde_json::json!({
                    "type": "score",
                    "iteration": iteration,
                    "score": score,
                }))?;
            }
            on_event(&TrainEvent::Score { iteration, score });
        }

        if sample_due(iteration, config.sample_every) {
            let mut stepper = RnnStepper::new(model.valid(), device);
            let text = generate_text(
                &mut stepper,
                &vocab,
                "",
                config.monitor_sample_size,
                &mut sample_rng,
                &config.generator,
            )?;
            if let Some(m) = metrics.as_mut() {
                m.write(&serde_json::json!({
                    "type": "sample",
                    "iteration": iteration,
                    "text": text,
                }))?;
            }
            on_event(&TrainEvent::Sample { iteration, text });
        }

        if is_due(iteration, config.checkpoint_every) {
            if let Some(stem) = config.checkpoint_path.as_deref() {
                save_char_model(&model.valid(), model_config, &vocab, iteration, score, stem)?;
            }
        }
    }

    tracing::info!(
        iterations = config.iterations,
        elapsed_s = start.elapsed().as_secs_f64(),
        score = last_score,
        "training finished"
    );
    Ok((model, last_score))
}

/// Observer that prints monitoring samples to stdout.
pub fn print_event(event: &TrainEvent) {
    if let TrainEvent::Sample { iteration, text } = event {
        println!("--- sample after {iteration} iterations ---");
        println!("{text}");
    }
}
