//! Character-level LSTM training binary.
//!
//! Reads a UTF-8 corpus, trains the two-layer LSTM on random fixed-length
//! windows, prints monitoring samples while training, saves the model and
//! finally generates text from a seed.
//!
//! `--restore` starts from the model saved under `--model` instead of a fresh
//! one; training then continues on it. `--no-train` skips training and only
//! generates.

use anyhow::{bail, Context, Result};
use burn::module::AutodiffModule;
use burn::tensor::backend::Backend;
use clap::Parser;
use nnplay::checkpoint::{load_char_model, save_char_model};
use nnplay::data::{CharBatchSampler, Corpus, SampleConfig, Vocabulary};
use nnplay::generation::{generate_text, GeneratorConfig};
use nnplay::model::{init_device, CharRnn, CharRnnConfig, RnnStepper, TrainBackend};
use nnplay::training::{print_event, train_char_model, TrainerConfig};
use nnplay::utils::init_tracing;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nnplay-train",
    about = "Train a character-level LSTM on a text corpus and generate from it"
)]
struct Args {
    /// UTF-8 training corpus
    #[arg(long, default_value = "data/corpus.txt")]
    corpus: PathBuf,

    /// Model path stem; writes <stem>.mpk and <stem>.json
    #[arg(long, default_value = "data/models/lstm")]
    model: PathBuf,

    /// Start from the model saved under --model instead of a fresh one
    #[arg(long)]
    restore: bool,

    /// Skip training and only generate
    #[arg(long)]
    no_train: bool,

    /// Number of training iterations (one batch each)
    #[arg(long, default_value_t = 10_000)]
    iterations: usize,

    /// Window length in characters
    #[arg(long, default_value_t = 32)]
    seq_len: usize,

    /// Windows per batch
    #[arg(long, default_value_t = 100)]
    batch_size: usize,

    /// Leading steps of each window excluded from the loss (default: seq_len / 2)
    #[arg(long)]
    warmup: Option<usize>,

    /// Units per LSTM layer
    #[arg(long, default_value_t = 512)]
    hidden_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 0.005)]
    learning_rate: f64,

    /// L2 weight decay
    #[arg(long, default_value_t = 1e-4)]
    l2: f32,

    /// Log the score every N iterations
    #[arg(long, default_value_t = 10)]
    score_every: usize,

    /// Print a sample every N iterations (0 = never)
    #[arg(long, default_value_t = 10)]
    sample_every: usize,

    /// Characters per monitoring sample
    #[arg(long, default_value_t = 100)]
    monitor_sample_size: usize,

    /// Save a checkpoint every N iterations (0 = only at the end)
    #[arg(long, default_value_t = 0)]
    checkpoint_every: usize,

    /// Output metrics file (JSONL)
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    /// Seed for batch sampling
    #[arg(long, default_value_t = 123_456_789)]
    data_seed: u64,

    /// Seed for weight initialization
    #[arg(long, default_value_t = 12345)]
    init_seed: u64,

    /// Seed for text generation
    #[arg(long, default_value_t = 34_352_442)]
    sample_seed: u64,

    /// Seed text fed to the model before generating
    #[arg(long, default_value = "Es war einmal")]
    seed_text: String,

    /// Number of characters to generate at the end
    #[arg(long, default_value_t = 3000)]
    sample_size: usize,
}

fn load_corpus(args: &Args) -> Result<Corpus> {
    Corpus::load(&args.corpus).with_context(|| format!("loading corpus {}", args.corpus.display()))
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let device = init_device();

    let mut corpus = None;
    let (model, model_config, vocab, done) = if args.restore {
        let (data, model) = load_char_model::<TrainBackend>(&args.model, &device)
            .with_context(|| format!("restoring {}", args.model.display()))?;
        let vocab = data.vocabulary();
        (model, data.model, vocab, data.iteration)
    } else {
        let loaded = load_corpus(&args)?;
        let vocab = loaded.vocab.clone();
        corpus = Some(loaded);
        TrainBackend::seed(args.init_seed);
        let model_config = CharRnnConfig::new(vocab.size()).with_hidden_size(args.hidden_size);
        let model = model_config.init::<TrainBackend>(&device);
        (model, model_config, vocab, 0)
    };

    vocab
        .encode(&args.seed_text)
        .with_context(|| format!("seed text {:?} does not fit the model vocabulary", args.seed_text))?;

    let model = if args.no_train {
        model
    } else {
        let corpus = match corpus {
            Some(c) => c,
            None => load_corpus(&args)?,
        };
        train(&args, model, &model_config, corpus, &vocab, done, &device)?
    };

    let mut stepper = RnnStepper::new(model.valid(), &device);
    let mut rng = StdRng::seed_from_u64(args.sample_seed);
    let text = generate_text(
        &mut stepper,
        &vocab,
        &args.seed_text,
        args.sample_size,
        &mut rng,
        &GeneratorConfig::default(),
    )?;
    println!("{}{}", args.seed_text, text);
    Ok(())
}

/// Train on `corpus` and save the result; `done` counts iterations already
/// behind a restored model.
fn train(
    args: &Args,
    model: CharRnn<TrainBackend>,
    model_config: &CharRnnConfig,
    corpus: Corpus,
    vocab: &Vocabulary,
    done: usize,
    device: &<TrainBackend as Backend>::Device,
) -> Result<CharRnn<TrainBackend>> {
    if corpus.vocab != *vocab {
        bail!(
            "corpus {} has a different vocabulary than the model in {}",
            args.corpus.display(),
            args.model.display()
        );
    }

    let mut sample_config = SampleConfig::new(args.seq_len, args.batch_size);
    if let Some(w) = args.warmup {
        sample_config.warmup_steps = w;
    }
    let mut sampler = CharBatchSampler::new(corpus, sample_config)?;
    let mut rng = StdRng::seed_from_u64(args.data_seed);

    let config = TrainerConfig {
        iterations: args.iterations,
        learning_rate: args.learning_rate,
        l2: args.l2,
        score_every: args.score_every,
        sample_every: args.sample_every,
        monitor_sample_size: args.monitor_sample_size,
        sample_seed: args.sample_seed,
        checkpoint_every: args.checkpoint_every,
        checkpoint_path: Some(args.model.clone()),
        metrics_file: args.metrics_file.clone(),
        generator: GeneratorConfig::default(),
    };

    let (model, score) = train_char_model(
        model,
        model_config,
        &mut sampler,
        &mut rng,
        &config,
        device,
        print_event,
    )?;
    save_char_model(&model.valid(), model_config, vocab, done + args.iterations, score, &args.model)
        .with_context(|| format!("saving {}", args.model.display()))?;
    Ok(model)
}
