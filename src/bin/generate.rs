//! Text generation from a saved character model.
//!
//! Restores a model written by `nnplay-train` and continues a seed text.
//! In interactive mode every line typed on stdin is used as a seed.

use anyhow::{Context, Result};
use clap::Parser;
use nnplay::checkpoint::load_char_model;
use nnplay::data::Vocabulary;
use nnplay::generation::{generate_text, GeneratorConfig};
use nnplay::model::{init_device, InferBackend, RnnStepper};
use nnplay::utils::init_tracing;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nnplay-generate",
    about = "Generate text from a trained character-level LSTM"
)]
struct Args {
    /// Model path stem written by nnplay-train
    #[arg(long, default_value = "data/models/lstm")]
    model: PathBuf,

    /// Seed text fed to the model before generating
    #[arg(long, default_value = "Es war einmal")]
    seed_text: String,

    /// Number of characters to generate
    #[arg(long, default_value_t = 3000)]
    sample_size: usize,

    /// Seed for the sampling RNG
    #[arg(long, default_value_t = 34_352_442)]
    sample_seed: u64,

    /// Character fed when the seed text is empty
    #[arg(long, default_value_t = ' ')]
    primer: char,

    /// Interactive mode: type seeds and see continuations
    #[arg(long)]
    interactive: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let device = init_device();

    let (data, model) = load_char_model::<InferBackend>(&args.model, &device)
        .with_context(|| format!("restoring {}", args.model.display()))?;
    let vocab = data.vocabulary();
    let mut stepper = RnnStepper::new(model, &device);
    let mut rng = StdRng::seed_from_u64(args.sample_seed);
    let config = GeneratorConfig {
        primer: args.primer,
    };

    if args.interactive {
        return interactive_mode(&mut stepper, &vocab, &mut rng, &config, args.sample_size);
    }

    let text = generate_text(
        &mut stepper,
        &vocab,
        &args.seed_text,
        args.sample_size,
        &mut rng,
        &config,
    )
    .context("generating text")?;
    println!("{}{}", args.seed_text, text);
    Ok(())
}

fn interactive_mode(
    stepper: &mut RnnStepper<InferBackend>,
    vocab: &Vocabulary,
    rng: &mut StdRng,
    config: &GeneratorConfig,
    sample_size: usize,
) -> Result<()> {
    eprintln!("Interactive mode. Type a seed text and press Enter; 'quit' exits.");
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let seed = line.trim_end_matches(['\r', '\n']);
        if seed == "quit" || seed == "exit" {
            break;
        }

        match generate_text(stepper, vocab, seed, sample_size, rng, config) {
            Ok(text) => println!("{seed}{text}"),
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}
