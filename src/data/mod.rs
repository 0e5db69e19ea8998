//! Corpus loading, vocabulary, training batches and digit images.
//!
//! ## Submodules
//!
//! - [`corpus`]: Text corpus as a character sequence
//! - [`vocab`]: Character vocabulary and one-hot encoding
//! - [`samples`]: Random fixed-length windows as masked training batches
//! - [`image`]: Labelled digit images, CSV loading and PNG output

pub mod corpus;
pub mod image;
pub mod samples;
pub mod vocab;

pub use corpus::Corpus;
pub use image::{ImageBatch, ImageDataset};
pub use samples::{CharBatchSampler, SampleConfig, SequenceBatch};
pub use vocab::Vocabulary;
