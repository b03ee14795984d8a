use std::fmt;

use serde::{Deserialize, Serialize};

use super::ComplexityTier;
use crate::domain::DomainError;

/// Coarse latency expectation of a backend model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyClass {
    Fast,
    #[default]
    Standard,
    Slow,
}

impl LatencyClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Standard => "standard",
            Self::Slow => "slow",
        }
    }
}

impl fmt::Display for LatencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a backend model, loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub provider: String,
    pub model: String,
    /// Relative cost, only meaningful when compared with other profiles
    pub cost: f64,
    #[serde(default)]
    pub latency_class: LatencyClass,
    pub max_context_tokens: usize,
    /// Lowest tier this model is allowed to serve
    pub min_tier: ComplexityTier,
}

impl ModelProfile {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        min_tier: ComplexityTier,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            cost: 1.0,
            latency_class: LatencyClass::default(),
            max_context_tokens: 8192,
            min_tier,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_latency_class(mut self, latency_class: LatencyClass) -> Self {
        self.latency_class = latency_class;
        self
    }

    pub fn with_max_context_tokens(mut self, max_context_tokens: usize) -> Self {
        self.max_context_tokens = max_context_tokens;
        self
    }

    /// Identifier in the form `provider/model`
    pub fn id(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }

    pub fn can_serve(&self, tier: ComplexityTier) -> bool {
        self.min_tier <= tier
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.provider.trim().is_empty() || self.model.trim().is_empty() {
            return Err(DomainError::configuration(
                "Model profile requires a provider and a model name",
            ));
        }

        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(DomainError::configuration(format!(
                "Model '{}' has an invalid cost: {}",
                self.id(),
                self.cost
            )));
        }

        if self.max_context_tokens == 0 {
            return Err(DomainError::configuration(format!(
                "Model '{}' must allow at least one context token",
                self.id()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_id() {
        let profile = ModelProfile::new("openai", "gpt-4o-mini", ComplexityTier::Simple);
        assert_eq!(profile.id(), "openai/gpt-4o-mini");
    }

    #[test]
    fn test_can_serve_tiers_at_or_above_minimum() {
        let profile = ModelProfile::new("openai", "gpt-4o", ComplexityTier::Moderate);

        assert!(!profile.can_serve(ComplexityTier::Simple));
        assert!(profile.can_serve(ComplexityTier::Moderate));
        assert!(profile.can_serve(ComplexityTier::Reasoning));
    }

    #[test]
    fn test_validate_rejects_negative_cost() {
        let profile = ModelProfile::new("openai", "gpt-4o", ComplexityTier::Simple).with_cost(-1.0);
        assert!(profile.validate().is_err());

        let profile = ModelProfile::new("", "gpt-4o", ComplexityTier::Simple);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_deserialize_profile() {
        let profile: ModelProfile = serde_json::from_str(
            r#"{"provider":"local","model":"llama","cost":0.1,"max_context_tokens":4096,"min_tier":"simple"}"#,
        )
        .unwrap();

        assert_eq!(profile.latency_class, LatencyClass::Standard);
        assert_eq!(profile.min_tier, ComplexityTier::Simple);
    }
}
