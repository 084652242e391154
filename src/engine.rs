// src/engine.rs
//! # Engine
//! Wires storage, cache, feedback, the two sentiment engines and the priority
//! scorer from an [`EngineConfig`]. This is what the HTTP layer and the binary hold.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::analyze::model::{build_loader, ModelLoader, ModelSentimentEngine};
use crate::analyze::rules::RuleBasedSentimentEngine;
use crate::analyze::scoring::{PriorityCategory, PriorityScorer};
use crate::analyze::types::{Analysis, AnalysisResult, AnalysisSource, Emotion, SentimentLabel};
use crate::analyze::Analyzer;
use crate::cache::AnalysisCache;
use crate::config::{EngineConfig, StorageBackend};
use crate::customers::{self, CustomerAnalysisData, CustomerMessage, MessageLog};
use crate::feedback::{FeedbackEntry, FeedbackEvent, FeedbackStore};
use crate::report::Report;
use crate::store::{FileStorage, MemoryStorage, ScopedStore, Storage};

const PROBE_TEXT: &str = "Thanks for the quick reply, the replacement arrived today.";

pub struct Engine {
    config: EngineConfig,
    scorer: PriorityScorer,
    cache: Arc<AnalysisCache>,
    feedback: Arc<FeedbackStore>,
    messages: MessageLog,
    analyzer: Analyzer,
}

impl Engine {
    /// Build from configuration: storage backend, model loader and lexicon.
    pub async fn from_config(config: EngineConfig) -> Result<Self> {
        let storage: Arc<dyn Storage> = match config.storage.backend {
            StorageBackend::File => {
                tokio::fs::create_dir_all(&config.storage.dir)
                    .await
                    .with_context(|| {
                        format!("creating state dir {}", config.storage.dir.display())
                    })?;
                Arc::new(FileStorage::new(config.storage.dir.clone()))
            }
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        };
        let loader = build_loader(&config.model);
        Ok(Self::with_parts(config, storage, loader).await)
    }

    /// Build over an explicit storage backend and model loader.
    pub async fn with_parts(
        config: EngineConfig,
        storage: Arc<dyn Storage>,
        loader: Arc<dyn ModelLoader>,
    ) -> Self {
        let store = ScopedStore::new(storage, config.tenant.clone());
        let cache = Arc::new(AnalysisCache::open(store.clone()).await);
        let feedback = Arc::new(FeedbackStore::open(store.clone(), cache.clone()).await);
        let messages = MessageLog::open(store).await;

        let rules = match &config.lexicon.path {
            Some(path) => {
                if !path.exists() {
                    warn!(path = %path.display(), "lexicon file not found; using built-in keywords until it appears");
                }
                RuleBasedSentimentEngine::hot_reload(path.clone())
            }
            None => RuleBasedSentimentEngine::new(),
        };
        let model = ModelSentimentEngine::new(loader);
        info!(
            tenant = %config.tenant,
            provider = model.provider_name(),
            cached = cache.len(),
            feedback = feedback.len(),
            "engine ready"
        );

        let analyzer = Analyzer::new(
            feedback.clone(),
            cache.clone(),
            Arc::new(model),
            Arc::new(rules),
        );

        Self {
            scorer: PriorityScorer::new(config.priority.max_interactions),
            config,
            cache,
            feedback,
            messages,
            analyzer,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tenant(&self) -> &str {
        &self.config.tenant
    }

    pub fn scorer(&self) -> &PriorityScorer {
        &self.scorer
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    pub fn feedback(&self) -> &FeedbackStore {
        &self.feedback
    }

    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    pub async fn analyze(&self, text: &str) -> AnalysisResult {
        self.analyzer.analyze(text).await
    }

    pub async fn analyze_traced(&self, text: &str) -> Analysis {
        self.analyzer.analyze_traced(text).await
    }

    pub async fn record_feedback(
        &self,
        customer_id: &str,
        original_prediction: AnalysisResult,
        corrected_emotion: Option<Emotion>,
        corrected_sentiment: Option<SentimentLabel>,
        original_text: Option<String>,
    ) -> FeedbackEntry {
        self.feedback
            .record(
                customer_id,
                original_prediction,
                corrected_emotion,
                corrected_sentiment,
                original_text,
            )
            .await
    }

    pub fn all_feedback(&self) -> Vec<FeedbackEntry> {
        self.feedback.get_all()
    }

    pub fn subscribe_feedback(&self) -> tokio::sync::broadcast::Receiver<FeedbackEvent> {
        self.feedback.subscribe()
    }

    pub async fn add_message(
        &self,
        customer_id: &str,
        customer_name: &str,
        text: &str,
    ) -> CustomerMessage {
        self.messages.append(customer_id, customer_name, text).await
    }

    /// Customers ranked by priority, highest first.
    pub async fn customer_priorities(
        &self,
        filter: Option<PriorityCategory>,
    ) -> Vec<CustomerAnalysisData> {
        customers::prioritize(&self.messages, &self.analyzer, &self.scorer, filter).await
    }

    /// Dashboard report over all customers and every logged message.
    pub async fn report(&self) -> Report {
        let rows = self.customer_priorities(None).await;
        let texts: Vec<String> = self.messages.all().into_iter().map(|m| m.text).collect();
        Report::build(&rows, &texts)
    }

    /// Run one sample text through the model (rules on failure) and log which
    /// path answered. Feedback and the cache are bypassed so nothing is stored.
    pub async fn probe_model(&self) -> Analysis {
        let model = self.analyzer.model();
        let out = match model.analyze(PROBE_TEXT).await {
            Ok(result) => Analysis {
                result,
                source: AnalysisSource::Model,
            },
            Err(e) => {
                warn!(error = %e, "model probe used the rule-based fallback");
                Analysis {
                    result: self.analyzer.rules().analyze(PROBE_TEXT),
                    source: AnalysisSource::Rules,
                }
            }
        };
        info!(
            provider = model.provider_name(),
            source = out.source.as_str(),
            dominant = %out.result.dominant_emotion,
            "model probe finished"
        );
        out
    }
}
