//! Character vocabulary for next-character prediction.
//!
//! Maps between characters and dense indices for one-hot encoding.
//! Indices are assigned in order of first appearance in the corpus, so the
//! same text always yields the same mapping.

use ndarray::Array1;
use std::collections::HashMap;

use crate::core::{NetError, NetResult};

/// Character-to-index vocabulary for one-hot encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    /// Ordered list of characters; position is the index.
    pub chars: Vec<char>,
    /// Reverse mapping from character to index.
    pub char_to_idx: HashMap<char, usize>,
}

impl Vocabulary {
    /// Build a vocabulary from text, assigning the next free index to each
    /// character the first time it is seen.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self::from_chars(text.chars())
    }

    /// Build a vocabulary from a character sequence in first-occurrence order.
    pub fn from_chars<I: IntoIterator<Item = char>>(chars: I) -> Self {
        let mut vocab = Self {
            chars: Vec::new(),
            char_to_idx: HashMap::new(),
        };
        for c in chars {
            if !vocab.char_to_idx.contains_key(&c) {
                vocab.char_to_idx.insert(c, vocab.chars.len());
                vocab.chars.push(c);
            }
        }
        vocab
    }

    /// Number of characters in the vocabulary.
    #[must_use]
    pub fn size(&self) -> usize {
        self.chars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Get the index for a character, or `None` if not in vocabulary.
    #[must_use]
    pub fn char_to_index(&self, c: char) -> Option<usize> {
        self.char_to_idx.get(&c).copied()
    }

    /// Get the index for a character, failing for characters the corpus never
    /// contained.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownCharacter`] if `c` is not in the vocabulary.
    pub fn require_index(&self, c: char) -> NetResult<usize> {
        self.char_to_index(c).ok_or(NetError::UnknownCharacter(c))
    }

    /// Get the character for an index, or `None` if out of bounds.
    #[must_use]
    pub fn index_to_char(&self, idx: usize) -> Option<char> {
        self.chars.get(idx).copied()
    }

    /// One-hot encode an index as a vector of length `self.size()`.
    #[must_use]
    pub fn one_hot_index(&self, idx: usize) -> Array1<f32> {
        let mut v = Array1::zeros(self.size());
        if idx < v.len() {
            v[idx] = 1.0;
        }
        v
    }

    /// One-hot encode a character.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownCharacter`] if `c` is not in the vocabulary.
    pub fn one_hot(&self, c: char) -> NetResult<Array1<f32>> {
        Ok(self.one_hot_index(self.require_index(c)?))
    }

    /// Encode text as vocabulary indices.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownCharacter`] for the first character outside
    /// the vocabulary.
    pub fn encode(&self, text: &str) -> NetResult<Vec<usize>> {
        text.chars().map(|c| self.require_index(c)).collect()
    }

    /// Decode a sequence of indices back into text.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::ShapeMismatch`] for an index outside the vocabulary.
    pub fn decode(&self, indices: &[usize]) -> NetResult<String> {
        indices
            .iter()
            .map(|&i| {
                self.index_to_char(i).ok_or_else(|| {
                    NetError::ShapeMismatch(format!(
                        "index {i} outside vocabulary of size {}",
                        self.size()
                    ))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_order() {
        let vocab = Vocabulary::from_text("hello world");
        assert_eq!(vocab.chars, vec!['h', 'e', 'l', 'o', ' ', 'w', 'r', 'd']);
        assert_eq!(vocab.char_to_index('h'), Some(0));
        assert_eq!(vocab.char_to_index('d'), Some(7));
    }

    #[test]
    fn test_bijection_onto_dense_range() {
        let text = "The quick brown fox jumps over the lazy dog. Ünïcödé too!";
        let vocab = Vocabulary::from_text(text);
        let mut seen = vec![false; vocab.size()];
        for c in text.chars() {
            let idx = vocab.char_to_index(c).expect("corpus char in vocab");
            assert_eq!(vocab.index_to_char(idx), Some(c));
            seen[idx] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_same_text_same_mapping() {
        let a = Vocabulary::from_text("abracadabra");
        let b = Vocabulary::from_text("abracadabra");
        assert_eq!(a, b);
    }

    #[test]
    fn test_case_is_preserved() {
        let vocab = Vocabulary::from_text("aA");
        assert_eq!(vocab.size(), 2);
    }

    #[test]
    fn test_unknown_char() {
        let vocab = Vocabulary::from_text("ab");
        assert_eq!(vocab.char_to_index('z'), None);
        assert_eq!(vocab.index_to_char(2), None);
        assert!(matches!(
            vocab.require_index('z'),
            Err(NetError::UnknownCharacter('z'))
        ));
    }

    #[test]
    fn test_one_hot_encode() {
        let vocab = Vocabulary::from_text("abc");
        let v = vocab.one_hot('b').expect("known char");
        assert_eq!(v.len(), 3);
        assert_eq!(v[1], 1.0);
        assert_eq!(v.sum(), 1.0);
    }

    #[test]
    fn test_encode_rejects_unknown_char() {
        let vocab = Vocabulary::from_text("Es war einmal");
        assert_eq!(vocab.encode("Es war").expect("known chars"), vec![0, 1, 2, 3, 4, 5]);
        assert!(matches!(
            vocab.encode("Es war einmal!"),
            Err(NetError::UnknownCharacter('!'))
        ));
    }

    #[test]
    fn test_decode() {
        let vocab = Vocabulary::from_text("ab");
        assert_eq!(vocab.decode(&[1, 0, 1]).expect("valid ids"), "bab");
        assert!(vocab.decode(&[5]).is_err());
    }
}
