//! Network definitions on top of the burn framework.
//!
//! ## Submodules
//!
//! - [`char_rnn`]: two-layer LSTM character model and its step-wise driver
//! - [`feed_forward`]: dense digit classifier
//! - [`autoencoder`]: digit autoencoder with a class-code bottleneck
//! - [`convert`]: ndarray <-> burn tensor conversion
//!
//! The default backend is burn's CPU `NdArray`; building with the `wgpu`
//! feature switches the binaries to the wgpu GPU backend.

pub mod autoencoder;
pub mod char_rnn;
pub mod convert;
pub mod feed_forward;

pub use autoencoder::{Autoencoder, AutoencoderConfig};
pub use char_rnn::{CharRnn, CharRnnConfig, RnnStepper};
pub use feed_forward::{FeedForward, FeedForwardConfig};

use burn::prelude::Backend;

/// Backend used for inference and as the inner backend for training.
#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray<f32>;
/// Backend used for inference and as the inner backend for training.
#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

/// Autodiff backend used by the training loops.
pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

/// Default device of [`InferBackend`] (CPU, or the best available GPU).
#[must_use]
pub fn init_device() -> <InferBackend as Backend>::Device {
    Default::default()
}
