// src/analyze/mod.rs
//! Analysis pipeline entry.
//!
//! Order per call, strictly sequential:
//! 1) empty/whitespace input → fixed neutral default
//! 2) feedback correction for the same text
//! 3) cached result for the same text
//! 4) language detection
//! 5) model engine, falling back to the rule-based engine on any failure
//! 6) store in cache

pub mod language;
pub mod model;
pub mod rules;
pub mod scoring;
pub mod types;

use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::AnalysisCache;
use crate::feedback::FeedbackStore;

// Re-export convenient types.
pub use crate::analyze::model::{ModelSentimentEngine, ENV_MODEL_TEST_MODE};
pub use crate::analyze::rules::{KeywordLexicon, RuleBasedSentimentEngine};
pub use crate::analyze::scoring::{categorize, PriorityCategory, PriorityScorer};
pub use crate::analyze::types::{
    Analysis, AnalysisResult, AnalysisSource, Emotion, EmotionResult, SentimentLabel,
    VERIFIED_CONFIDENCE,
};

/// Short SHA-256 prefix used in logs instead of the raw text.
pub fn anon_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().take(6).map(|b| format!("{:02x}", b)).collect()
}

/// The analysis orchestrator. Never fails: every path ends in a valid result.
pub struct Analyzer {
    feedback: Arc<FeedbackStore>,
    cache: Arc<AnalysisCache>,
    model: Arc<ModelSentimentEngine>,
    rules: Arc<RuleBasedSentimentEngine>,
}

impl Analyzer {
    pub fn new(
        feedback: Arc<FeedbackStore>,
        cache: Arc<AnalysisCache>,
        model: Arc<ModelSentimentEngine>,
        rules: Arc<RuleBasedSentimentEngine>,
    ) -> Self {
        Self {
            feedback,
            cache,
            model,
            rules,
        }
    }

    pub fn model(&self) -> &ModelSentimentEngine {
        &self.model
    }

    pub fn rules(&self) -> &RuleBasedSentimentEngine {
        &self.rules
    }

    pub async fn analyze(&self, text: &str) -> AnalysisResult {
        self.analyze_traced(text).await.result
    }

    /// Like [`Analyzer::analyze`], also reporting which stage produced the result.
    pub async fn analyze_traced(&self, text: &str) -> Analysis {
        let started = Instant::now();
        let analysis = self.run(text).await;

        metrics::counter!("analysis_requests_total", "source" => analysis.source.as_str())
            .increment(1);
        metrics::histogram!("analysis_duration_ms")
            .record(started.elapsed().as_secs_f64() * 1000.0);
        tracing::debug!(
            text_id = %anon_id(text),
            source = analysis.source.as_str(),
            dominant = %analysis.result.dominant_emotion,
            sentiment = %analysis.result.sentiment,
            "analysis complete"
        );
        analysis
    }

    async fn run(&self, text: &str) -> Analysis {
        if text.trim().is_empty() {
            return Analysis {
                result: AnalysisResult::neutral_default(),
                source: AnalysisSource::Empty,
            };
        }

        if let Some(result) = self.feedback.find_correction_for(text) {
            return Analysis {
                result,
                source: AnalysisSource::Feedback,
            };
        }

        if let Some(result) = self.cache.get(text) {
            return Analysis {
                result,
                source: AnalysisSource::Cache,
            };
        }

        let language = language::detect(text);

        let (mut result, source) = match self.model.analyze(text).await {
            Ok(r) => (r, AnalysisSource::Model),
            Err(e) => {
                metrics::counter!("model_failures_total").increment(1);
                tracing::debug!(error = %e, "model path unavailable; using rule-based engine");
                (self.rules.analyze(text), AnalysisSource::Rules)
            }
        };
        result.language = language.to_string();

        self.cache.put(text, result.clone()).await;
        Analysis { result, source }
    }
}
