//! Shared error type and the recurrent-model interface.
//!
//! Text generation only needs a model that can be stepped one character at a
//! time while carrying its recurrent state between calls. [`SequenceModel`]
//! captures exactly that, so the generator works against the burn LSTM as
//! well as against small deterministic models in tests.

use ndarray::Array1;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Error type for corpus, sampling, model and checkpoint operations.
#[derive(Debug)]
pub enum NetError {
    /// File could not be read or written.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A character outside the training vocabulary was fed to the model.
    UnknownCharacter(char),
    /// Invalid sampler, trainer or model configuration.
    InvalidConfig(String),
    /// Corpus too short to cut a single window from.
    CorpusTooShort { len: usize, seq_len: usize },
    /// Shape mismatch between tensors, datasets or vocabularies.
    ShapeMismatch(String),
    /// An optimization step produced an unusable result.
    Training(String),
    /// Model checkpoint could not be saved or restored.
    Checkpoint(String),
    /// Image encoding or writing failed.
    Image(String),
    /// Malformed input data.
    Parse { line: usize, message: String },
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Io { path, source } => write!(f, "I/O error on {}: {}", path.display(), source),
            NetError::UnknownCharacter(c) => {
                write!(f, "Character {:?} is not in the training vocabulary", c)
            }
            NetError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            NetError::CorpusTooShort { len, seq_len } => write!(
                f,
                "Corpus of {} chars is too short for sequences of length {}",
                len, seq_len
            ),
            NetError::ShapeMismatch(msg) => write!(f, "Shape mismatch: {}", msg),
            NetError::Training(msg) => write!(f, "Training failed: {}", msg),
            NetError::Checkpoint(msg) => write!(f, "Checkpoint error: {}", msg),
            NetError::Image(msg) => write!(f, "Image error: {}", msg),
            NetError::Parse { line, message } => write!(f, "Parse error on line {}: {}", line, message),
        }
    }
}

impl Error for NetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NetError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type NetResult<T> = Result<T, NetError>;

/// A recurrent model that can be driven one time step at a time.
pub trait SequenceModel {
    /// Width of the one-hot input and of the output distribution.
    fn vocab_size(&self) -> usize;

    /// Forget all recurrent state.
    fn clear_state(&mut self);

    /// Feed one one-hot input vector and return the output distribution for
    /// this step. Recurrent state is carried over to the next call.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::ShapeMismatch`] if `input` has the wrong width.
    fn time_step(&mut self, input: &Array1<f32>) -> NetResult<Array1<f32>>;
}

impl<M: SequenceModel + ?Sized> SequenceModel for &mut M {
    fn vocab_size(&self) -> usize {
        (**self).vocab_size()
    }

    fn clear_state(&mut self) {
        (**self).clear_state();
    }

    fn time_step(&mut self, input: &Array1<f32>) -> NetResult<Array1<f32>> {
        (**self).time_step(input)
    }
}
