//! OpenAI-compatible model listing, extended with routing profile fields

use serde::{Deserialize, Serialize};

use crate::domain::{ComplexityTier, LatencyClass, ModelProfile};

/// Model information (OpenAI format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
    pub min_tier: ComplexityTier,
    pub cost: f64,
    pub latency_class: LatencyClass,
    pub max_context_tokens: usize,
}

impl Model {
    pub fn from_profile(profile: &ModelProfile) -> Self {
        Self {
            id: profile.id(),
            object: "model".to_string(),
            created: 0,
            owned_by: profile.provider.clone(),
            min_tier: profile.min_tier,
            cost: profile.cost,
            latency_class: profile.latency_class,
            max_context_tokens: profile.max_context_tokens,
        }
    }
}

/// List models response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<Model>,
}

impl ModelsResponse {
    pub fn new(models: Vec<Model>) -> Self {
        Self {
            object: "list".to_string(),
            data: models,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_from_profile() {
        let profile = ModelProfile::new("openai", "gpt-4o", ComplexityTier::Complex)
            .with_cost(5.0)
            .with_latency_class(LatencyClass::Slow);

        let model = Model::from_profile(&profile);
        let json = serde_json::to_value(&model).unwrap();

        assert_eq!(json["id"], "openai/gpt-4o");
        assert_eq!(json["owned_by"], "openai");
        assert_eq!(json["min_tier"], "complex");
        assert_eq!(json["latency_class"], "slow");
    }

    #[test]
    fn test_models_response() {
        let profile = ModelProfile::new("local", "llama", ComplexityTier::Simple);
        let response = ModelsResponse::new(vec![Model::from_profile(&profile)]);

        assert_eq!(response.object, "list");
        assert_eq!(response.data.len(), 1);
    }
}
