//! Character-by-character text generation.
//!
//! Generation runs in two phases:
//!
//! 1. **Warm-up**: the seed text is fed through the model one character at a
//!    time so the recurrent state reflects its context. Outputs are
//!    discarded.
//! 2. **Sampling**: the primer character (a space by default) is fed once
//!    and the first character is drawn from that step's output by
//!    inverse-CDF sampling. Every drawn character is appended to the text
//!    and fed back as the next input.

use rand::Rng;

use crate::core::{NetError, NetResult, SequenceModel};
use crate::data::Vocabulary;

/// Generation settings.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Character fed once after the seed; its output is the distribution of
    /// the first generated character. Falls back to index 0 if the
    /// vocabulary does not contain it.
    pub primer: char,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { primer: ' ' }
    }
}

/// Pick an index from a discrete distribution given a uniform draw `u`.
///
/// Walks the distribution in index order and returns the first index at
/// which the running sum exceeds `u`. If rounding keeps the total mass at or
/// below `u`, the last index is returned.
#[must_use]
pub fn sample_index(distribution: &[f32], u: f64) -> usize {
    let mut cumulative = 0.0f64;
    for (i, &p) in distribution.iter().enumerate() {
        cumulative += f64::from(p);
        if cumulative > u {
            return i;
        }
    }
    distribution.len().saturating_sub(1)
}

/// Clear recurrent state and feed the seed text through the model,
/// discarding every output.
///
/// # Errors
///
/// Returns [`NetError::UnknownCharacter`] for seed characters outside the
/// vocabulary, and propagates model errors.
pub fn warm_up<M: SequenceModel + ?Sized>(
    model: &mut M,
    vocab: &Vocabulary,
    seed: &str,
) -> NetResult<()> {
    check_vocab(model.vocab_size(), vocab)?;
    let inputs = seed
        .chars()
        .map(|c| vocab.one_hot(c))
        .collect::<NetResult<Vec<_>>>()?;

    model.clear_state();
    for input in &inputs {
        model.time_step(input)?;
    }
    Ok(())
}

/// Generate `sample_size` characters following `seed`.
///
/// The returned string holds only the generated characters, not the seed.
///
/// # Errors
///
/// Returns [`NetError::UnknownCharacter`] if the seed uses characters the
/// model was not trained on, [`NetError::InvalidConfig`] for an empty
/// vocabulary, and propagates model errors.
pub fn generate_text<M, R>(
    model: &mut M,
    vocab: &Vocabulary,
    seed: &str,
    sample_size: usize,
    rng: &mut R,
    config: &GeneratorConfig,
) -> NetResult<String>
where
    M: SequenceModel + ?Sized,
    R: Rng + ?Sized,
{
    warm_up(model, vocab, seed)?;
    let primer = vocab.char_to_index(config.primer).unwrap_or(0);
    let mut input = vocab.one_hot_index(primer);
    let mut text = String::with_capacity(sample_size);

    for _ in 0..sample_size {
        let distribution = model.time_step(&input)?;
        let u: f64 = rng.gen();
        let idx = match distribution.as_slice() {
            Some(probs) => sample_index(probs, u),
            None => sample_index(&distribution.to_vec(), u),
        };
        let c = vocab
            .index_to_char(idx)
            .ok_or_else(|| NetError::ShapeMismatch(format!("sampled index {idx} outside vocabulary")))?;
        text.push(c);
        input = vocab.one_hot_index(idx);
    }

    Ok(text)
}

fn check_vocab(model_width: usize, vocab: &Vocabulary) -> NetResult<()> {
    if vocab.is_empty() {
        return Err(NetError::InvalidConfig("empty vocabulary".to_string()));
    }
    if model_width != vocab.size() {
        return Err(NetError::ShapeMismatch(format!(
            "model expects {} inputs but vocabulary has {} characters",
            model_width,
            vocab.size()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Model whose output puts most mass on the character after its input,
    /// counting steps so tests can observe the warm-up.
    struct NextCharModel {
        k: usize,
        steps: usize,
        inputs: Vec<usize>,
    }

    impl NextCharModel {
        fn new(k: usize) -> Self {
            Self {
                k,
                steps: 0,
                inputs: Vec::new(),
            }
        }
    }

    impl SequenceModel for NextCharModel {
        fn vocab_size(&self) -> usize {
            self.k
        }

        fn clear_state(&mut self) {
            self.inputs.clear();
        }

        fn time_step(&mut self, input: &Array1<f32>) -> NetResult<Array1<f32>> {
            let idx = input.iter().position(|&v| v == 1.0).unwrap_or(0);
            self.steps += 1;
            self.inputs.push(idx);
            #[allow(clippy::cast_precision_loss)]
            let rest = 0.2 / (self.k - 1) as f32;
            let mut out = Array1::from_elem(self.k, rest);
            out[(idx + 1) % self.k] = 0.8;
            Ok(out)
        }
    }

    #[test]
    fn test_sample_index_inverse_cdf() {
        let dist = [0.1, 0.3, 0.6];
        assert_eq!(sample_index(&dist, 0.05), 0);
        assert_eq!(sample_index(&dist, 0.35), 1);
        assert_eq!(sample_index(&dist, 0.95), 2);
        assert_eq!(sample_index(&dist, 1.0 + 1e-9), 2);
    }

    #[test]
    fn test_sample_index_first_crossing() {
        // Running sum equals u exactly at index 0; the crossing is at index 1.
        assert_eq!(sample_index(&[0.5, 0.5], 0.5), 1);
        assert_eq!(sample_index(&[0.0, 0.0, 1.0], 0.0), 2);
    }

    #[test]
    fn test_sample_index_deficient_mass() {
        assert_eq!(sample_index(&[0.2, 0.2, 0.2], 0.9), 2);
    }

    #[test]
    fn test_generates_exact_length() {
        let vocab = Vocabulary::from_text("abcd");
        let mut model = NextCharModel::new(4);
        let mut rng = StdRng::seed_from_u64(34_352_442);
        let text = generate_text(&mut model, &vocab, "ab", 50, &mut rng, &GeneratorConfig::default())
            .expect("generate");
        assert_eq!(text.chars().count(), 50);
        assert!(text.chars().all(|c| vocab.char_to_index(c).is_some()));
    }

    #[test]
    fn test_warm_up_feeds_seed() {
        let vocab = Vocabulary::from_text("abcd");
        let mut model = NextCharModel::new(4);
        let mut rng = StdRng::seed_from_u64(1);
        generate_text(&mut model, &vocab, "dcb", 5, &mut rng, &GeneratorConfig::default())
            .expect("generate");
        assert_eq!(&model.inputs[..3], &[3, 2, 1]);
        // 3 warm-up steps, the primer, then one feedback step per generated
        // character except the last.
        assert_eq!(model.steps, 3 + 5);
    }

    #[test]
    fn test_primer_follows_seed() {
        let vocab = Vocabulary::from_text("ab ");
        let mut model = NextCharModel::new(3);
        let mut rng = StdRng::seed_from_u64(1);
        let text = generate_text(&mut model, &vocab, "ab", 3, &mut rng, &GeneratorConfig::default())
            .expect("generate");
        assert_eq!(model.inputs[..3], [0, 1, 2]);
        assert_eq!(model.inputs.len(), 2 + 3);
        // Every later input is the character sampled one step earlier.
        let fed_back: String = model.inputs[3..]
            .iter()
            .map(|&i| vocab.index_to_char(i).expect("in vocab"))
            .collect();
        assert!(text.starts_with(&fed_back));
    }

    #[test]
    fn test_warm_up_discards_outputs() {
        let vocab = Vocabulary::from_text("abcd");
        let mut model = NextCharModel::new(4);
        model.inputs.push(9);
        warm_up(&mut model, &vocab, "ab").expect("warm up");
        assert_eq!(model.inputs, vec![0, 1]);
        assert_eq!(model.steps, 2);
    }

    #[test]
    fn test_empty_seed_uses_primer() {
        let vocab = Vocabulary::from_text("ab c");
        let mut model = NextCharModel::new(4);
        let mut rng = StdRng::seed_from_u64(1);
        generate_text(&mut model, &vocab, "", 1, &mut rng, &GeneratorConfig::default())
            .expect("generate");
        assert_eq!(model.inputs, vec![2]);

        let vocab = Vocabulary::from_text("xyz!");
        let mut model = NextCharModel::new(4);
        generate_text(&mut model, &vocab, "", 1, &mut rng, &GeneratorConfig::default())
            .expect("generate");
        assert_eq!(model.inputs, vec![0]);
    }

    #[test]
    fn test_unknown_seed_char_feeds_nothing() {
        let vocab = Vocabulary::from_text("abcd");
        let mut model = NextCharModel::new(4);
        let result = warm_up(&mut model, &vocab, "abz");
        assert!(matches!(result, Err(NetError::UnknownCharacter('z'))));
        assert_eq!(model.steps, 0);
    }

    #[test]
    fn test_same_seed_same_text() {
        let vocab = Vocabulary::from_text("abcdef");
        let run = || {
            let mut model = NextCharModel::new(6);
            let mut rng = StdRng::seed_from_u64(34_352_442);
            generate_text(&mut model, &vocab, "abc", 200, &mut rng, &GeneratorConfig::default())
                .expect("generate")
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_unknown_seed_char() {
        let vocab = Vocabulary::from_text("abcd");
        let mut model = NextCharModel::new(4);
        let mut rng = StdRng::seed_from_u64(1);
        let result = generate_text(&mut model, &vocab, "abz", 5, &mut rng, &GeneratorConfig::default());
        assert!(matches!(result, Err(NetError::UnknownCharacter('z'))));
    }

    #[test]
    fn test_vocab_width_mismatch() {
        let vocab = Vocabulary::from_text("abc");
        let mut model = NextCharModel::new(4);
        let mut rng = StdRng::seed_from_u64(1);
        let result = generate_text(&mut model, &vocab, "a", 5, &mut rng, &GeneratorConfig::default());
        assert!(matches!(result, Err(NetError::ShapeMismatch(_))));
    }
}
