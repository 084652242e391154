// src/analyze/model.rs
//! Model-backed sentiment/emotion engine: classifier abstraction, lazy one-shot
//! loading with a permanent failure flag, and concrete classifiers.
//!
//! Two text classifiers are used: a binary sentiment model (POSITIVE/NEGATIVE)
//! and a multi-class emotion model whose labels are mapped into [`Emotion`].
//! Non-English text is passed to the models verbatim.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::language;
use super::types::{sort_emotions, AnalysisResult, Emotion, EmotionResult, SentimentLabel};
use crate::config::ModelConfig;
use crate::error::ModelError;

pub const SENTIMENT_TOP_K: usize = 2;
pub const EMOTION_TOP_K: usize = 5;

/// Env switch that forces the deterministic mock classifiers.
pub const ENV_MODEL_TEST_MODE: &str = "MODEL_TEST_MODE";

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// One label returned by a text classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// A loaded text-classification model.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Top-`k` labels for `text`, highest score first.
    async fn classify(&self, text: &str, top_k: usize) -> Result<Vec<LabelScore>, ModelError>;
    fn name(&self) -> &str;
}

/// The sentiment + emotion classifier pair produced by a loader.
#[derive(Clone)]
pub struct ClassifierPair {
    pub sentiment: Arc<dyn Classifier>,
    pub emotion: Arc<dyn Classifier>,
}

/// Constructs the classifier pair. Called at most once per engine unless it fails.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<ClassifierPair, ModelError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Factory: build a loader according to config and environment.
///
/// * If `MODEL_TEST_MODE=mock`, returns the deterministic mock loader.
/// * Else if `config.enabled == false`, returns a disabled loader.
/// * Else builds the configured provider.
pub fn build_loader(config: &ModelConfig) -> Arc<dyn ModelLoader> {
    if std::env::var(ENV_MODEL_TEST_MODE)
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(StaticLoader::mock());
    }

    if !config.enabled {
        return Arc::new(DisabledLoader);
    }

    match config.provider.as_str() {
        "huggingface" => Arc::new(HttpModelLoader::new(config.clone())),
        "mock" => Arc::new(StaticLoader::mock()),
        other => {
            warn!(provider = other, "unknown model provider; model path disabled");
            Arc::new(DisabledLoader)
        }
    }
}

// ------------------------------------------------------------
// Engine
// ------------------------------------------------------------

/// Lazily loads its classifiers on first use and memoizes them for the life of
/// the engine. A failed load sets a permanent flag: later calls return
/// `ModelError::Unavailable` immediately without retrying.
pub struct ModelSentimentEngine {
    loader: Arc<dyn ModelLoader>,
    models: OnceCell<ClassifierPair>,
    failed: AtomicBool,
    load_attempts: AtomicUsize,
}

impl ModelSentimentEngine {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            models: OnceCell::new(),
            failed: AtomicBool::new(false),
            load_attempts: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(build_loader(config))
    }

    pub fn provider_name(&self) -> &'static str {
        self.loader.provider_name()
    }

    /// True once a load attempt has failed.
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub fn is_loaded(&self) -> bool {
        self.models.initialized()
    }

    /// Number of times the loader has been invoked.
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::Relaxed)
    }

    async fn models(&self) -> Result<&ClassifierPair, ModelError> {
        if self.has_failed() {
            debug!(provider = self.provider_name(), "model load previously failed; skipping");
            return Err(ModelError::Unavailable("model load previously failed".into()));
        }

        self.models
            .get_or_try_init(|| async {
                // A concurrent caller may have failed while we waited for the cell.
                if self.has_failed() {
                    return Err(ModelError::Unavailable("model load previously failed".into()));
                }
                self.load_attempts.fetch_add(1, Ordering::Relaxed);
                info!(provider = self.provider_name(), "initializing sentiment and emotion models");
                match self.loader.load().await {
                    Ok(pair) => {
                        info!(
                            sentiment = pair.sentiment.name(),
                            emotion = pair.emotion.name(),
                            "models ready"
                        );
                        Ok(pair)
                    }
                    Err(e) => {
                        self.failed.store(true, Ordering::Release);
                        warn!(provider = self.provider_name(), error = %e, "model initialization failed; using rule-based fallback from now on");
                        Err(e)
                    }
                }
            })
            .await
    }

    /// Classify `text` with both models.
    pub async fn analyze(&self, text: &str) -> Result<AnalysisResult, ModelError> {
        let models = self.models().await?;
        let language = language::detect(text);
        if language != "en" {
            debug!(language, "processing non-English text with English models");
        }

        let sentiment_raw = models.sentiment.classify(text, SENTIMENT_TOP_K).await?;
        let (sentiment, sentiment_score) = map_sentiment(&sentiment_raw);

        let emotion_raw = models.emotion.classify(text, EMOTION_TOP_K).await?;
        let emotions = map_emotions(&emotion_raw);
        let top = *emotions.first().ok_or(ModelError::EmptyOutput)?;

        Ok(AnalysisResult {
            sentiment,
            sentiment_score,
            dominant_emotion: top.emotion,
            confidence_score: top.score,
            emotions,
            language: language.to_string(),
            original_text: None,
        })
    }
}

/// Map binary sentiment labels onto the [0,1] higher-is-more-positive scale.
/// Only labels scoring above 0.5 count; a NEGATIVE score is inverted.
pub fn map_sentiment(results: &[LabelScore]) -> (SentimentLabel, f32) {
    let mut label = SentimentLabel::Neutral;
    let mut score = 0.5;
    for r in results {
        let raw = r.score.clamp(0.0, 1.0);
        if r.label.eq_ignore_ascii_case("positive") && raw > 0.5 {
            label = SentimentLabel::Positive;
            score = raw;
        } else if r.label.eq_ignore_ascii_case("negative") && raw > 0.5 {
            label = SentimentLabel::Negative;
            score = 1.0 - raw;
        }
    }
    (label, score)
}

/// Map raw emotion labels through the synonym table, sorted by score.
/// When two raw labels map to the same emotion, the higher score is kept.
pub fn map_emotions(results: &[LabelScore]) -> Vec<EmotionResult> {
    let mut out: Vec<EmotionResult> = Vec::with_capacity(results.len());
    for r in results {
        let score = r.score.clamp(0.0, 1.0);
        let emotion = Emotion::from_model_label(&r.label);
        match out.iter_mut().find(|e| e.emotion == emotion) {
            Some(existing) if existing.score >= score => {}
            Some(existing) => {
                existing.score = score;
                existing.confidence = score;
            }
            None => out.push(EmotionResult {
                emotion,
                score,
                confidence: score,
            }),
        }
    }
    sort_emotions(&mut out);
    out
}

// ------------------------------------------------------------
// Loaders
// ------------------------------------------------------------

/// Always fails to load; used when the model path is disabled.
pub struct DisabledLoader;

#[async_trait]
impl ModelLoader for DisabledLoader {
    async fn load(&self) -> Result<ClassifierPair, ModelError> {
        Err(ModelError::Disabled)
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Returns a fixed classifier pair; for tests and local runs.
pub struct StaticLoader {
    pair: ClassifierPair,
}

impl StaticLoader {
    pub fn new(sentiment: Arc<dyn Classifier>, emotion: Arc<dyn Classifier>) -> Self {
        Self {
            pair: ClassifierPair { sentiment, emotion },
        }
    }

    /// Neutral-leaning deterministic pair.
    pub fn mock() -> Self {
        Self::new(
            Arc::new(StaticClassifier::new(
                "mock-sentiment",
                vec![
                    LabelScore::new("POSITIVE", 0.5),
                    LabelScore::new("NEGATIVE", 0.5),
                ],
            )),
            Arc::new(StaticClassifier::new(
                "mock-emotion",
                vec![
                    LabelScore::new("neutral", 0.8),
                    LabelScore::new("joy", 0.1),
                    LabelScore::new("surprise", 0.05),
                    LabelScore::new("sadness", 0.03),
                    LabelScore::new("anger", 0.02),
                ],
            )),
        )
    }
}

#[async_trait]
impl ModelLoader for StaticLoader {
    async fn load(&self) -> Result<ClassifierPair, ModelError> {
        Ok(self.pair.clone())
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Classifier that ignores its input and returns fixed labels.
#[derive(Debug, Clone)]
pub struct StaticClassifier {
    name: String,
    labels: Vec<LabelScore>,
}

impl StaticClassifier {
    pub fn new(name: impl Into<String>, mut labels: Vec<LabelScore>) -> Self {
        labels.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self {
            name: name.into(),
            labels,
        }
    }
}

#[async_trait]
impl Classifier for StaticClassifier {
    async fn classify(&self, _text: &str, top_k: usize) -> Result<Vec<LabelScore>, ModelError> {
        Ok(self.labels.iter().take(top_k).cloned().collect())
    }
    fn name(&self) -> &str {
        &self.name
    }
}

// ------------------------------------------------------------
// HTTP inference (Hugging Face Inference API compatible)
// ------------------------------------------------------------

/// Builds two [`HttpClassifier`]s sharing one HTTP client.
pub struct HttpModelLoader {
    config: ModelConfig,
}

impl HttpModelLoader {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ModelLoader for HttpModelLoader {
    async fn load(&self) -> Result<ClassifierPair, ModelError> {
        let http = reqwest::Client::builder()
            .user_agent("customer-priority-engine/0.1")
            .connect_timeout(Duration::from_secs(self.config.connect_timeout_secs))
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()?;

        let sentiment = HttpClassifier::new(
            http.clone(),
            &self.config.endpoint,
            &self.config.sentiment_model,
            &self.config.api_key,
        );
        let emotion = HttpClassifier::new(
            http,
            &self.config.endpoint,
            &self.config.emotion_model,
            &self.config.api_key,
        );

        if self.config.warm_up {
            sentiment.classify("warm up", 1).await?;
            emotion.classify("warm up", 1).await?;
        }

        Ok(ClassifierPair {
            sentiment: Arc::new(sentiment),
            emotion: Arc::new(emotion),
        })
    }
    fn provider_name(&self) -> &'static str {
        "huggingface"
    }
}

/// Calls `POST {endpoint}/{model}` with `{"inputs": text, "parameters": {"top_k": k}}`.
pub struct HttpClassifier {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl HttpClassifier {
    pub fn new(http: reqwest::Client, endpoint: &str, model: &str, api_key: &str) -> Self {
        Self {
            http,
            url: format!("{}/{}", endpoint.trim_end_matches('/'), model),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Serialize)]
struct InferenceReq<'a> {
    inputs: &'a str,
    parameters: InferenceParams,
}

#[derive(Serialize)]
struct InferenceParams {
    top_k: usize,
}

/// The API returns either `[[{label,score}]]` (batched) or `[{label,score}]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResp {
    Batched(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl InferenceResp {
    fn into_labels(self) -> Vec<LabelScore> {
        match self {
            InferenceResp::Batched(mut v) => {
                if v.is_empty() {
                    Vec::new()
                } else {
                    v.swap_remove(0)
                }
            }
            InferenceResp::Flat(v) => v,
        }
    }
}

/// Parse a classifier response body into labels sorted by score, truncated to `top_k`.
pub fn parse_inference_body(body: &str, top_k: usize) -> Result<Vec<LabelScore>, ModelError> {
    let resp: InferenceResp =
        serde_json::from_str(body).map_err(|e| ModelError::Decode(e.to_string()))?;
    let mut labels = resp.into_labels();
    if labels.is_empty() {
        return Err(ModelError::EmptyOutput);
    }
    labels.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    labels.truncate(top_k);
    Ok(labels)
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str, top_k: usize) -> Result<Vec<LabelScore>, ModelError> {
        let req = InferenceReq {
            inputs: text,
            parameters: InferenceParams { top_k },
        };
        let mut builder = self.http.post(&self.url).json(&req);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ModelError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        parse_inference_body(&body, top_k)
    }
    fn name(&self) -> &str {
        &self.model
    }
}
