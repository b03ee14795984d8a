use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Expected resource cost of answering a query.
///
/// Variants are declared in ascending order so the derived `Ord` matches
/// `simple < moderate < complex < reasoning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    Simple,
    Moderate,
    Complex,
    Reasoning,
}

impl ComplexityTier {
    pub const ALL: [ComplexityTier; 4] = [
        ComplexityTier::Simple,
        ComplexityTier::Moderate,
        ComplexityTier::Complex,
        ComplexityTier::Reasoning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
            Self::Reasoning => "reasoning",
        }
    }
}

impl fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplexityTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "moderate" => Ok(Self::Moderate),
            "complex" => Ok(Self::Complex),
            "reasoning" => Ok(Self::Reasoning),
            other => Err(DomainError::validation(format!(
                "Unknown complexity tier '{}'",
                other
            ))),
        }
    }
}
