//! # nnplay
//!
//! Small neural-network experiments on top of burn.
//!
//! ## Overview
//!
//! The main experiment is a character-level LSTM language model: it learns
//! next-character prediction from a plain-text corpus and then writes new
//! text character by character from a seed. Two digit-image experiments sit
//! next to it, a feed-forward classifier and an autoencoder whose class codes
//! can be decoded into prototype images.
//!
//! ## Structure
//!
//! - [`core`]: Error type and the step-wise sequence model interface
//! - [`data`]: Corpus, vocabulary, batch sampling and digit images
//! - [`model`]: burn network definitions
//! - [`training`]: Training loops and evaluation
//! - [`generation`]: Seeded text generation
//! - [`checkpoint`]: Model save/restore
//! - [`utils`]: Logging setup and helpers

pub mod checkpoint;
pub mod core;
pub mod data;
pub mod generation;
pub mod model;
pub mod training;
pub mod utils;

pub use core::{NetError, NetResult, SequenceModel};
pub use data::{CharBatchSampler, Corpus, SampleConfig, Vocabulary};
pub use generation::{generate_text, sample_index, GeneratorConfig};
pub use training::{train_char_model, TrainEvent, TrainerConfig};
