//! Classify command - shows how a query would be routed
//!
//! Reads the same configuration as `serve` but never calls a model or the
//! embedding endpoint.

use clap::Args;
use serde::Serialize;

use crate::config::AppConfig;
use crate::domain::{ComplexityClassifier, ComplexityTier, FeatureExtractor, Features, LlmRequest};
use crate::infrastructure::logging;
use crate::infrastructure::tokenizer::UnicodeTokenCounter;

/// Arguments for the classify command
#[derive(Args, Clone)]
pub struct ClassifyArgs {
    /// Query text to classify
    pub text: String,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct ClassifyReport {
    pub features: Features,
    pub tier: ComplexityTier,
    /// Ordered candidates, empty when the registry could not be built
    pub candidates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run the classify command
pub async fn run(args: ClassifyArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&logging::LoggingConfig::from(&config.logging));

    let report = build_report(&config, &args.text);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Classify `text`; candidate lookup failures are reported, not fatal
pub fn build_report(config: &AppConfig, text: &str) -> ClassifyReport {
    let extractor = FeatureExtractor::new(std::sync::Arc::new(UnicodeTokenCounter::new()));
    let classifier = ComplexityClassifier::new(config.router.classifier.clone());

    let features = extractor.extract(text);
    let tier = classifier.classify(&features);

    let request = LlmRequest::builder().user(text).build();
    let candidates = crate::build_request_router(config)
        .and_then(|router| router.preview(&request))
        .map(|preview| preview.candidates);

    match candidates {
        Ok(candidates) => ClassifyReport {
            features,
            tier,
            candidates,
            error: None,
        },
        Err(e) => ClassifyReport {
            features,
            tier,
            candidates: Vec::new(),
            error: Some(e.to_string()),
        },
    }
}

fn print_report(report: &ClassifyReport) {
    let f = &report.features;

    println!("tier:                 {}", report.tier);
    println!("tokens:               {}", f.token_count);
    println!("issue signals:        {}", f.issue_signal_count);
    println!("questions:            {}", f.question_count);
    println!("multi-part:           {}", f.has_multi_part);
    println!("requests analysis:    {}", f.requests_analysis);
    println!("negativity:           {:.2}", f.sentiment_negativity);

    if let Some(ref error) = report.error {
        println!("candidates:           unavailable ({})", error);
    } else {
        println!("candidates:           {}", report.candidates.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_models() -> AppConfig {
        let mut config = AppConfig::default();
        config.models = serde_json::from_value(serde_json::json!([
            {"provider": "local", "model": "small", "base_url": "http://localhost:1", "min_tier": "simple", "cost": 0.1},
            {"provider": "local", "model": "large", "base_url": "http://localhost:1", "min_tier": "complex", "cost": 5.0}
        ]))
        .unwrap();
        config
    }

    #[test]
    fn test_report_lists_candidates() {
        let report = build_report(&config_with_models(), "How do I reset my password?");

        assert_eq!(report.tier, ComplexityTier::Simple);
        assert_eq!(report.candidates, vec!["local/small"]);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_report_without_models_still_classifies() {
        let report = build_report(&AppConfig::default(), "How do I reset my password?");

        assert_eq!(report.tier, ComplexityTier::Simple);
        assert!(report.candidates.is_empty());
        assert!(report.error.is_some());
    }
}
