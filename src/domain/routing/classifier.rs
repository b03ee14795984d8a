//! Rule-based complexity classification

use serde::{Deserialize, Serialize};

use super::{ComplexityTier, Features};
use crate::domain::DomainError;

/// Tunable thresholds for the classification rubric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Queries must stay below this token count to be `simple`
    #[serde(default = "default_simple_max_tokens")]
    pub simple_max_tokens: usize,

    /// Queries above this token count are at least `complex`
    #[serde(default = "default_complex_min_tokens")]
    pub complex_min_tokens: usize,

    #[serde(default = "default_complex_min_issue_signals")]
    pub complex_min_issue_signals: usize,

    #[serde(default = "default_reasoning_min_issue_signals")]
    pub reasoning_min_issue_signals: usize,

    /// Negativity at or above this value rules out `simple`
    #[serde(default = "default_negativity_threshold")]
    pub negativity_threshold: f32,
}

fn default_simple_max_tokens() -> usize {
    24
}

fn default_complex_min_tokens() -> usize {
    180
}

fn default_complex_min_issue_signals() -> usize {
    2
}

fn default_reasoning_min_issue_signals() -> usize {
    3
}

fn default_negativity_threshold() -> f32 {
    0.5
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            simple_max_tokens: default_simple_max_tokens(),
            complex_min_tokens: default_complex_min_tokens(),
            complex_min_issue_signals: default_complex_min_issue_signals(),
            reasoning_min_issue_signals: default_reasoning_min_issue_signals(),
            negativity_threshold: default_negativity_threshold(),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.simple_max_tokens >= self.complex_min_tokens {
            return Err(DomainError::configuration(format!(
                "simple_max_tokens ({}) must be lower than complex_min_tokens ({})",
                self.simple_max_tokens, self.complex_min_tokens
            )));
        }

        if self.complex_min_issue_signals == 0 {
            return Err(DomainError::configuration(
                "complex_min_issue_signals must be at least 1",
            ));
        }

        if self.reasoning_min_issue_signals < self.complex_min_issue_signals {
            return Err(DomainError::configuration(format!(
                "reasoning_min_issue_signals ({}) must not be lower than complex_min_issue_signals ({})",
                self.reasoning_min_issue_signals, self.complex_min_issue_signals
            )));
        }

        if !(0.0..=1.0).contains(&self.negativity_threshold) {
            return Err(DomainError::configuration(format!(
                "negativity_threshold must be within [0, 1], got {}",
                self.negativity_threshold
            )));
        }

        Ok(())
    }
}

/// Maps [`Features`] to a [`ComplexityTier`].
///
/// The rubric is evaluated top-down and the first matching rule wins:
///
/// 1. `reasoning` when the issue count reaches the reasoning minimum or the
///    query explicitly asks for analysis
/// 2. `complex` when the issue count reaches the complex minimum or the query
///    is long
/// 3. `simple` when the query is short, single-intent and calm
/// 4. `moderate` for everything else
///
/// Classification is total: ambiguous input lands on `moderate`.
#[derive(Debug, Clone, Default)]
pub struct ComplexityClassifier {
    config: ClassifierConfig,
}

impl ComplexityClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn classify(&self, features: &Features) -> ComplexityTier {
        let config = &self.config;

        if features.issue_signal_count >= config.reasoning_min_issue_signals
            || features.requests_analysis
        {
            return ComplexityTier::Reasoning;
        }

        if features.issue_signal_count >= config.complex_min_issue_signals
            || features.token_count > config.complex_min_tokens
        {
            return ComplexityTier::Complex;
        }

        let single_intent = !features.has_multi_part
            && features.issue_signal_count == 0
            && features.question_count <= 1;

        if features.token_count < config.simple_max_tokens
            && single_intent
            && features.sentiment_negativity < config.negativity_threshold
        {
            return ComplexityTier::Simple;
        }

        ComplexityTier::Moderate
    }
}
