//! Text corpus loading.
//!
//! A corpus is the full text of one file as a character sequence plus the
//! vocabulary built over it.

use std::path::Path;

use super::vocab::Vocabulary;
use crate::core::{NetError, NetResult};

/// A loaded text corpus.
#[derive(Debug, Clone)]
pub struct Corpus {
    /// Every character of the source text, in order.
    pub text: Vec<char>,
    /// Vocabulary over `text` in first-occurrence order.
    pub vocab: Vocabulary,
}

impl Corpus {
    /// Build a corpus from in-memory text.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let text: Vec<char> = text.chars().collect();
        let vocab = Vocabulary::from_chars(text.iter().copied());
        Self { text, vocab }
    }

    /// Read a UTF-8 text file into a corpus.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if the file cannot be opened or is not valid UTF-8.
    pub fn load(path: &Path) -> NetResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| NetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let corpus = Self::from_text(&raw);
        tracing::info!(
            path = %path.display(),
            text_size = corpus.len(),
            distinct_chars = corpus.vocab.size(),
            "read text completed"
        );
        Ok(corpus)
    }

    /// Number of characters in the corpus.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Vocabulary index of the character at `pos`, or `None` past the end.
    #[must_use]
    pub fn index_at(&self, pos: usize) -> Option<usize> {
        self.text.get(pos).and_then(|&c| self.vocab.char_to_index(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_from_text() {
        let corpus = Corpus::from_text("ababab");
        assert_eq!(corpus.len(), 6);
        assert_eq!(corpus.vocab.size(), 2);
        assert_eq!(corpus.index_at(0), Some(0));
        assert_eq!(corpus.index_at(1), Some(1));
        assert_eq!(corpus.index_at(corpus.len()), None);
    }

    #[test]
    fn test_load_utf8_file() {
        let dir = std::env::temp_dir().join("nnplay_test_corpus");
        fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("corpus.txt");
        fs::write(&path, "Es war einmal, ein Mädchen.\n").expect("write corpus");

        let corpus = Corpus::load(&path).expect("load corpus");
        assert_eq!(corpus.len(), "Es war einmal, ein Mädchen.\n".chars().count());
        assert!(corpus.vocab.char_to_index('ä').is_some());

        let reloaded = Corpus::load(&path).expect("reload corpus");
        assert_eq!(corpus.vocab, reloaded.vocab);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Corpus::load(Path::new("/nonexistent/corpus.txt"));
        assert!(matches!(result, Err(NetError::Io { .. })));
    }
}
