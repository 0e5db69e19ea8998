//! Checkpoint save/load for trained networks.
//!
//! A checkpoint is a path stem with two files next to each other:
//!
//! - `<stem>.mpk`: model parameters written by burn's full-precision
//!   MessagePack recorder
//! - `<stem>.json`: metadata needed to rebuild the model before loading the
//!   parameters into it (architecture config, vocabulary, training progress)

use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::{NetError, NetResult};
use crate::data::Vocabulary;
use crate::model::{CharRnn, CharRnnConfig};

type ModelRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Serializable metadata for a character model checkpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointData {
    /// Architecture of the saved network.
    pub model: CharRnnConfig,
    /// Vocabulary characters in index order.
    pub vocab: Vec<char>,
    /// Training iterations completed when the checkpoint was written.
    pub iteration: usize,
    /// Loss of the last training batch; `None` before the first step.
    pub score: Option<f64>,
}

impl CheckpointData {
    #[must_use]
    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::from_chars(self.vocab.iter().copied())
    }
}

/// Path of the metadata file belonging to a checkpoint stem.
#[must_use]
pub fn metadata_path(stem: &Path) -> PathBuf {
    stem.with_extension("json")
}

fn create_parent(path: &Path) -> NetResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| NetError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Save the parameters of any module under `stem`.
///
/// # Errors
///
/// Returns [`NetError::Checkpoint`] if the recorder fails.
pub fn save_module<B: Backend, M: Module<B>>(module: M, stem: &Path) -> NetResult<()> {
    create_parent(stem)?;
    module
        .save_file(stem.to_path_buf(), &ModelRecorder::new())
        .map_err(|e| NetError::Checkpoint(format!("failed to save {}: {e:?}", stem.display())))
}

/// Load parameters saved with [`save_module`] into `module`.
///
/// `module` must have the same architecture as the saved one.
///
/// # Errors
///
/// Returns [`NetError::Checkpoint`] if the file is missing or does not match.
pub fn load_module<B: Backend, M: Module<B>>(
    module: M,
    stem: &Path,
    device: &B::Device,
) -> NetResult<M> {
    module
        .load_file(stem.to_path_buf(), &ModelRecorder::new(), device)
        .map_err(|e| NetError::Checkpoint(format!("failed to load {}: {e:?}", stem.display())))
}

/// Save a character model with its metadata.
///
/// # Errors
///
/// Returns an error if either file cannot be written.
pub fn save_char_model<B: Backend>(
    model: &CharRnn<B>,
    config: &CharRnnConfig,
    vocab: &Vocabulary,
    iteration: usize,
    score: f64,
    stem: &Path,
) -> NetResult<()> {
    if vocab.size() != model.vocab_size() {
        return Err(NetError::ShapeMismatch(format!(
            "vocabulary of {} chars for a model with {} classes",
            vocab.size(),
            model.vocab_size()
        )));
    }
    let data = CheckpointData {
        model: config.clone(),
        vocab: vocab.chars.clone(),
        iteration,
        score: score.is_finite().then_some(score),
    };
    let json = serde_json::to_string_pretty(&data)
        .map_err(|e| NetError::Checkpoint(format!("failed to serialize metadata: {e}")))?;

    save_module(model.clone(), stem)?;
    let meta = metadata_path(stem);
    std::fs::write(&meta, json).map_err(|source| NetError::Io { path: meta, source })?;
    tracing::info!(path = %stem.display(), iteration, "model saved");
    Ok(())
}

/// Restore a character model and its metadata.
///
/// # Errors
///
/// Returns an error if the metadata cannot be read or parsed, or the
/// parameters do not fit the recorded architecture.
pub fn load_char_model<B: Backend>(
    stem: &Path,
    device: &B::Device,
) -> NetResult<(CheckpointData, CharRnn<B>)> {
    let meta = metadata_path(stem);
    let json = std::fs::read_to_string(&meta).map_err(|source| NetError::Io {
        path: meta.clone(),
        source,
    })?;
    let data: CheckpointData = serde_json::from_str(&json)
        .map_err(|e| NetError::Checkpoint(format!("failed to parse {}: {e}", meta.display())))?;

    if data.vocab.len() != data.model.vocab_size {
        return Err(NetError::Checkpoint(format!(
            "metadata lists {} chars for a model with {} classes",
            data.vocab.len(),
            data.model.vocab_size
        )));
    }

    let model = load_module(data.model.init::<B>(device), stem, device)?;
    tracing::info!(
        path = %stem.display(),
        iteration = data.iteration,
        vocab = data.vocab.len(),
        "model restored"
    );
    Ok((data, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SequenceModel;
    use crate::model::RnnStepper;
    use approx::assert_abs_diff_eq;
    use burn::backend::NdArray;
    use std::fs;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_checkpoint_round_trip() {
        let device = Default::default();
        let vocab = Vocabulary::from_text("abc ");
        let config = CharRnnConfig::new(vocab.size()).with_hidden_size(6);
        let model = config.init::<TestBackend>(&device);

        let dir = std::env::temp_dir().join("nnplay_test_checkpoint");
        let stem = dir.join("lstm");
        save_char_model(&model, &config, &vocab, 7, 1.25, &stem).expect("save");
        assert!(metadata_path(&stem).exists());

        let (data, loaded) = load_char_model::<TestBackend>(&stem, &device).expect("load");
        assert_eq!(data.iteration, 7);
        assert_eq!(data.score, Some(1.25));
        assert_eq!(data.vocabulary(), vocab);
        assert_eq!(data.model.hidden_size, 6);

        let x = vocab.one_hot('b').expect("known char");
        let original = RnnStepper::new(model, &device).time_step(&x).expect("step");
        let restored = RnnStepper::new(loaded, &device).time_step(&x).expect("step");
        for (a, b) in original.iter().zip(restored.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_vocab_mismatch_rejected() {
        let device = Default::default();
        let config = CharRnnConfig::new(3).with_hidden_size(4);
        let model = config.init::<TestBackend>(&device);
        let vocab = Vocabulary::from_text("ab");
        let stem = std::env::temp_dir().join("nnplay_test_mismatch").join("lstm");
        let result = save_char_model(&model, &config, &vocab, 0, 0.0, &stem);
        assert!(matches!(result, Err(NetError::ShapeMismatch(_))));
    }

    #[test]
    fn test_load_nonexistent_checkpoint() {
        let device = Default::default();
        let result = load_char_model::<TestBackend>(Path::new("/nonexistent/lstm"), &device);
        assert!(matches!(result, Err(NetError::Io { .. })));
    }
}
