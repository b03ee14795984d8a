//! Lexical feature extraction for complexity classification
//!
//! Extraction is pure and local: it never touches the network and its cost is
//! bounded by the length of the input text.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Splits text into clauses on sentence punctuation and coordinating conjunctions
static CLAUSE_SPLIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[.!?;:,\n]+|\b(?:and|but|or|yet|so|plus|also|however)\b").unwrap()
});

/// Negative-outcome keywords that mark a distinct complaint or sub-problem
static ISSUE_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)\b(
            (?:over|double[-\s]?)?charged | charges? | billed
            | damaged | broken | defective | faulty
            | never\s+(?:shipped|arrived|received|delivered|came)
            | not\s+(?:working|received|delivered|arrived|loading|responding)
            | doesn'?t\s+work | won'?t\s+(?:work|load|start|open)
            | missing | duplicate[sd]? | refund(?:ed)? | wrong
            | fail(?:ed|s|ure)? | errors? | crash(?:ed|es|ing)?
            | lost | late | delayed | stuck | declined | cancel(?:l)?ed | bug(?:gy|s)?
        )\b",
    )
    .unwrap()
});

/// Words carrying negative sentiment
static NEGATIVE_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(angry|furious|frustrat(?:ed|ing)|terrible|awful|horrible|unacceptable|disappoint(?:ed|ing)|ridiculous|worst|upset|annoy(?:ed|ing)|hate|outrageous|useless|fed\s+up)\b",
    )
    .unwrap()
});

/// Lines that look like list items (`- x`, `* x`, `• x`, `1. x`, `2) x`)
static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:[-*•]|\d+[.)])\s+\S").unwrap());

static SEQUENCE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(first(?:ly)?|second(?:ly)?|third(?:ly)?|then|next|additionally|finally|lastly|moreover)\b")
        .unwrap()
});

static ANALYSIS_REQUEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(compare|comparison|step[-\s]by[-\s]step|pros\s+and\s+cons|trade[-\s]?offs?|analy[sz]e|analysis|evaluate|versus|vs|reason\s+through|walk\s+me\s+through)\b",
    )
    .unwrap()
});

/// Number of negative-sentiment hits that saturates the negativity score
const NEGATIVITY_SATURATION: f32 = 3.0;

/// Counts tokens in a piece of text
pub trait TokenCounter: Send + Sync + std::fmt::Debug {
    fn count(&self, text: &str) -> usize;

    /// Name of the tokenizer for logging
    fn name(&self) -> &str;
}

/// Signals derived from a query's text
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Features {
    pub token_count: usize,
    /// Approximate number of distinct complaints or sub-problems
    pub issue_signal_count: usize,
    pub has_multi_part: bool,
    /// Share of negative sentiment in `[0, 1]`
    pub sentiment_negativity: f32,
    pub question_count: usize,
    /// Explicit request for comparison or multi-step analysis
    pub requests_analysis: bool,
}

/// Derives [`Features`] from raw query text
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    counter: Arc<dyn TokenCounter>,
}

impl FeatureExtractor {
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self { counter }
    }

    pub fn tokenizer_name(&self) -> &str {
        self.counter.name()
    }

    pub fn extract(&self, text: &str) -> Features {
        let text = text.trim();

        if text.is_empty() {
            return Features::default();
        }

        let question_count = text.matches('?').count();

        Features {
            token_count: self.counter.count(text),
            issue_signal_count: count_issue_signals(text),
            has_multi_part: is_multi_part(text, question_count),
            sentiment_negativity: negativity(text),
            question_count,
            requests_analysis: ANALYSIS_REQUEST.is_match(text),
        }
    }
}

/// Each clause mentioning at least one negative outcome counts once
fn count_issue_signals(text: &str) -> usize {
    CLAUSE_SPLIT
        .split(text)
        .filter(|clause| !clause.trim().is_empty())
        .filter(|clause| ISSUE_KEYWORD.is_match(clause))
        .count()
}

fn is_multi_part(text: &str, question_count: usize) -> bool {
    question_count >= 2
        || LIST_ITEM.find_iter(text).count() >= 2
        || SEQUENCE_MARKER.find_iter(text).count() >= 2
}

fn negativity(text: &str) -> f32 {
    let hits = NEGATIVE_WORD.find_iter(text).count() as f32;
    (hits / NEGATIVITY_SATURATION).min(1.0)
}


#[cfg(test)]
mod tests {
    use super::mock::WhitespaceTokenCounter;
    use super::*;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(Arc::new(WhitespaceTokenCounter))
    }

    #[test]
    fn test_empty_text_yields_zero_features() {
        let features = extractor().extract("   ");
        assert_eq!(features, Features::default());
    }

    #[test]
    fn test_short_question() {
        let features = extractor().extract("What are your business hours?");

        assert_eq!(features.token_count, 5);
        assert_eq!(features.issue_signal_count, 0);
        assert_eq!(features.question_count, 1);
        assert!(!features.has_multi_part);
        assert!(!features.requests_analysis);
        assert_eq!(features.sentiment_negativity, 0.0);
    }

    #[test]
    fn test_multiple_complaints_are_counted_per_clause() {
        let features = extractor().extract(
            "I placed three orders last month but was charged for four. Two items arrived \
             damaged, one never shipped, and my account shows duplicate charges.",
        );

        assert_eq!(features.issue_signal_count, 4);
    }

    #[test]
    fn test_one_clause_with_many_keywords_counts_once() {
        let features = extractor().extract("The refund was wrong and late");
        // "and" splits the text into two clauses, both with a keyword
        assert_eq!(features.issue_signal_count, 2);

        let features = extractor().extract("Wrong refund amount");
        assert_eq!(features.issue_signal_count, 1);
    }

    #[test]
    fn test_multi_part_detection() {
        assert!(extractor().extract("How do I reset it? Where is the button?").has_multi_part);
        assert!(extractor().extract("- reset password\n- update email").has_multi_part);
        assert!(
            extractor()
                .extract("First open settings, then pick a plan")
                .has_multi_part
        );
        assert!(!extractor().extract("Open settings").has_multi_part);
    }

    #[test]
    fn test_negativity_saturates() {
        let features = extractor().extract("This is terrible, awful, unacceptable and I am furious");
        assert_eq!(features.sentiment_negativity, 1.0);

        let features = extractor().extract("I am upset");
        assert!(features.sentiment_negativity > 0.3 && features.sentiment_negativity < 0.34);
    }

    #[test]
    fn test_analysis_request() {
        assert!(
            extractor()
                .extract("Compare the annual and monthly plans")
                .requests_analysis
        );
        assert!(
            extractor()
                .extract("Walk me through the setup step by step")
                .requests_analysis
        );
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let text = "My package never arrived and support was useless.";
        assert_eq!(extractor().extract(text), extractor().extract(text));
    }
}
