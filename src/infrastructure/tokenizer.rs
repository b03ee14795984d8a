//! Default token counter

use unicode_segmentation::UnicodeSegmentation;

use crate::domain::TokenCounter;

/// Counts Unicode word-boundary segments that are not whitespace.
///
/// Words and punctuation marks each count as one token, which tracks BPE
/// token counts closely enough for tier thresholds without a vocabulary file.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeTokenCounter;

impl UnicodeTokenCounter {
    pub fn new() -> Self {
        Self
    }
}

impl TokenCounter for UnicodeTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.split_word_bounds()
            .filter(|segment| !segment.trim().is_empty())
            .count()
    }

    fn name(&self) -> &str {
        "unicode-words"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_words_and_punctuation() {
        let counter = UnicodeTokenCounter::new();

        assert_eq!(counter.count("What are your business hours?"), 6);
        assert_eq!(counter.count("Hello, world!"), 4);
    }

    #[test]
    fn test_empty_and_whitespace() {
        let counter = UnicodeTokenCounter::new();

        assert_eq!(counter.count(""), 0);
        assert_eq!(counter.count("  \n\t "), 0);
    }

    #[test]
    fn test_non_latin_text() {
        let counter = UnicodeTokenCounter::new();

        assert_eq!(counter.count("Где мой заказ?"), 4);
    }
}
