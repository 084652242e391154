// src/config/model.rs
use serde::{Deserialize, Serialize};
use std::env;

fn default_provider() -> String {
    "huggingface".to_string()
}
fn default_endpoint() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_sentiment_model() -> String {
    "distilbert-base-uncased-finetuned-sst-2-english".to_string()
}
fn default_emotion_model() -> String {
    "j-hartmann/emotion-english-distilroberta-base".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    4
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_warm_up() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "huggingface" | "mock" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Base URL; the model id is appended as a path segment.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// "ENV" means: read from HF_API_TOKEN.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_sentiment_model")]
    pub sentiment_model: String,
    #[serde(default = "default_emotion_model")]
    pub emotion_model: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Run one inference while loading so a dead endpoint fails the load, not the first call.
    #[serde(default = "default_warm_up")]
    pub warm_up: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            endpoint: default_endpoint(),
            api_key: default_api_key(),
            sentiment_model: default_sentiment_model(),
            emotion_model: default_emotion_model(),
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            warm_up: default_warm_up(),
        }
    }
}

impl ModelConfig {
    /// Normalize provider, resolve `"ENV"` api keys and sanitize timeouts.
    pub fn resolved(mut self) -> anyhow::Result<Self> {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match self.provider.as_str() {
                "huggingface" if self.enabled => env::var("HF_API_TOKEN")
                    .map_err(|_| anyhow::anyhow!("Missing HF_API_TOKEN env var"))?,
                _ => String::new(),
            };
        }

        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = default_connect_timeout_secs();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self.endpoint = self.endpoint.trim_end_matches('/').to_string();

        Ok(self)
    }
}
