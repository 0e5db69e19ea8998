//! Random sequence batches for next-character prediction.
//!
//! Each training example is a window of `seq_len` consecutive corpus
//! characters starting at a random offset. The label sequence is the same
//! window shifted one character forward, so at every time step the network
//! is asked to predict the character that follows its input.
//!
//! Tensor layout follows `[batch, vocab, time]`:
//! ```text
//! features[b, v, t] = 1  iff  text[offset_b + t]     has index v
//! labels[b, v, t]   = 1  iff  text[offset_b + t + 1] has index v
//! ```
//!
//! The label mask zeroes the first `warmup_steps` time steps so that the
//! recurrent state has seen some context before predictions are scored.

use ndarray::{Array2, Array3};
use rand::Rng;

use super::corpus::Corpus;
use crate::core::{NetError, NetResult};

/// Configuration for batch sampling.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    /// Number of time steps per example.
    pub seq_len: usize,
    /// Number of examples per batch.
    pub batch_size: usize,
    /// Leading time steps excluded from the loss.
    pub warmup_steps: usize,
}

impl SampleConfig {
    /// Config with the warm-up cutoff at half the sequence length.
    #[must_use]
    pub fn new(seq_len: usize, batch_size: usize) -> Self {
        Self {
            seq_len,
            batch_size,
            warmup_steps: seq_len / 2,
        }
    }
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self::new(32, 100)
    }
}

/// One training batch of one-hot sequences with masks.
#[derive(Debug, Clone)]
pub struct SequenceBatch {
    /// Inputs, shape `(batch, vocab, seq_len)`.
    pub features: Array3<f32>,
    /// Next-character targets, shape `(batch, vocab, seq_len)`.
    pub labels: Array3<f32>,
    /// Which input steps are present, shape `(batch, seq_len)`.
    pub feature_mask: Array2<f32>,
    /// Which output steps contribute to the loss, shape `(batch, seq_len)`.
    pub label_mask: Array2<f32>,
    /// Start offset of each example in the corpus.
    pub offsets: Vec<usize>,
}

impl SequenceBatch {
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.features.dim().0
    }

    #[must_use]
    pub fn seq_len(&self) -> usize {
        self.features.dim().2
    }

    /// Number of (example, step) pairs that count towards the loss.
    #[must_use]
    pub fn scored_steps(&self) -> usize {
        self.label_mask.iter().filter(|&&m| m > 0.0).count()
    }
}

/// Draws random fixed-length windows from a corpus.
#[derive(Debug, Clone)]
pub struct CharBatchSampler {
    corpus: Corpus,
    config: SampleConfig,
    batches_drawn: usize,
}

impl CharBatchSampler {
    /// Create a sampler over `corpus`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::CorpusTooShort`] if the corpus cannot hold one window
    /// plus its shifted label, and [`NetError::InvalidConfig`] for a zero batch
    /// size or a warm-up that masks every step.
    pub fn new(corpus: Corpus, config: SampleConfig) -> NetResult<Self> {
        if config.seq_len == 0 || config.batch_size == 0 {
            return Err(NetError::InvalidConfig(format!(
                "seq_len ({}) and batch_size ({}) must be positive",
                config.seq_len, config.batch_size
            )));
        }
        if config.warmup_steps >= config.seq_len {
            return Err(NetError::InvalidConfig(format!(
                "warmup_steps ({}) must be smaller than seq_len ({})",
                config.warmup_steps, config.seq_len
            )));
        }
        if corpus.len() < config.seq_len + 2 {
            return Err(NetError::CorpusTooShort {
                len: corpus.len(),
                seq_len: config.seq_len,
            });
        }
        Ok(Self {
            corpus,
            config,
            batches_drawn: 0,
        })
    }

    #[must_use]
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    #[must_use]
    pub fn config(&self) -> &SampleConfig {
        &self.config
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// Input width of a model trained on this sampler.
    #[must_use]
    pub fn input_columns(&self) -> usize {
        self.corpus.vocab.size()
    }

    /// Number of batches produced since creation or the last [`reset`](Self::reset).
    #[must_use]
    pub fn batches_drawn(&self) -> usize {
        self.batches_drawn
    }

    pub fn reset(&mut self) {
        self.batches_drawn = 0;
    }

    /// Exclusive upper bound for start offsets.
    ///
    /// Every offset `o < bound` satisfies `o + seq_len < corpus.len()`.
    #[must_use]
    pub fn offset_bound(&self) -> usize {
        self.corpus.len() - self.config.seq_len - 1
    }

    /// Draw one batch with an independent random offset per example.
    pub fn next_batch<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SequenceBatch {
        let bound = self.offset_bound();
        let offsets: Vec<usize> = (0..self.config.batch_size)
            .map(|_| rng.gen_range(0..bound))
            .collect();
        self.batches_drawn += 1;
        tracing::trace!(batch = self.batches_drawn, ?offsets, "sampled batch");
        self.encode(&offsets)
    }

    /// Encode the windows starting at the given offsets.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::ShapeMismatch`] if an offset is not below
    /// [`offset_bound`](Self::offset_bound).
    pub fn batch_at(&self, offsets: &[usize]) -> NetResult<SequenceBatch> {
        let bound = self.offset_bound();
        if let Some(&offset) = offsets.iter().find(|&&o| o >= bound) {
            return Err(NetError::ShapeMismatch(format!(
                "offset {offset} must be below {bound} for windows of {} chars",
                self.config.seq_len
            )));
        }
        Ok(self.encode(offsets))
    }

    /// Offsets are below `offset_bound`, so every window and label position
    /// lies inside the corpus.
    fn encode(&self, offsets: &[usize]) -> SequenceBatch {
        let n = offsets.len();
        let vocab_size = self.corpus.vocab.size();
        let seq_len = self.config.seq_len;

        let mut features = Array3::zeros((n, vocab_size, seq_len));
        let mut labels = Array3::zeros((n, vocab_size, seq_len));

        for (b, &offset) in offsets.iter().enumerate() {
            for t in 0..seq_len {
                if let Some(c) = self.corpus.index_at(offset + t) {
                    features[[b, c, t]] = 1.0;
                }
                if let Some(c) = self.corpus.index_at(offset + t + 1) {
                    labels[[b, c, t]] = 1.0;
                }
            }
        }

        let feature_mask = Array2::ones((n, seq_len));
        let mut label_mask = Array2::ones((n, seq_len));
        label_mask
            .slice_mut(ndarray::s![.., ..self.config.warmup_steps])
            .fill(0.0);

        SequenceBatch {
            features,
            labels,
            feature_mask,
            label_mask,
            offsets: offsets.to_vec(),
        }
    }
}
