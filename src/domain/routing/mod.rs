//! Complexity classification and model selection
//!
//! Turns raw query text into a [`ComplexityTier`] and the tier into an
//! ordered list of backend models (primary followed by fallbacks).

mod classifier;
mod decision;
mod features;
mod profile;
mod registry;
mod selector;
mod tier;

pub use classifier::{ClassifierConfig, ComplexityClassifier};
pub use decision::{CacheStatus, RouteDecision};
pub use features::{FeatureExtractor, Features, TokenCounter};
pub use profile::{LatencyClass, ModelProfile};
pub use registry::ModelRegistry;
pub use selector::ModelSelector;
pub use tier::ComplexityTier;

#[cfg(test)]
pub use features::mock::WhitespaceTokenCounter;
