use thiserror::Error;

use super::routing::ComplexityTier;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Embedding error: {message}")]
    Embedding { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("No eligible model for tier '{tier}'")]
    NoEligibleModel { tier: ComplexityTier },

    #[error("All {attempts} upstream model(s) failed: {message}")]
    UpstreamExhausted { attempts: usize, message: String },

    #[error("Cache store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Timed out: {message}")]
    Timeout { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn no_eligible_model(tier: ComplexityTier) -> Self {
        Self::NoEligibleModel { tier }
    }

    pub fn upstream_exhausted(attempts: usize, message: impl Into<String>) -> Self {
        Self::UpstreamExhausted {
            attempts,
            message: message.into(),
        }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Errors caused by deployment configuration rather than a transient fault
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::NoEligibleModel { .. }
        )
    }
}
