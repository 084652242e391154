// src/feedback.rs
//! Human feedback on predictions.
//!
//! The log is append-only. Recording a correction also patches the analysis
//! cache so the corrected label sticks for identical text, and notifies
//! subscribers through a broadcast channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

use crate::analyze::types::{AnalysisResult, Emotion, SentimentLabel};
use crate::cache::{text_key, AnalysisCache};
use crate::store::{ScopedStore, FEEDBACK_KEY};

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub timestamp: DateTime<Utc>,
    pub customer_id: String,
    pub original_prediction: AnalysisResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_emotion: Option<Emotion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_sentiment: Option<SentimentLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    /// True when the reviewer supplied no correction.
    pub was_correct: bool,
}

impl FeedbackEntry {
    pub fn has_correction(&self) -> bool {
        self.corrected_emotion.is_some() || self.corrected_sentiment.is_some()
    }

    /// The original prediction with this entry's corrections applied.
    pub fn corrected_result(&self) -> AnalysisResult {
        let mut result = self.original_prediction.clone();
        result.apply_correction(self.corrected_emotion, self.corrected_sentiment);
        result
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedbackEvent {
    Updated {
        customer_id: String,
        was_correct: bool,
        timestamp: DateTime<Utc>,
    },
}

pub struct FeedbackStore {
    store: ScopedStore,
    cache: Arc<AnalysisCache>,
    entries: RwLock<Vec<FeedbackEntry>>,
    persist_lock: tokio::sync::Mutex<()>,
    events: broadcast::Sender<FeedbackEvent>,
}

impl FeedbackStore {
    pub async fn open(store: ScopedStore, cache: Arc<AnalysisCache>) -> Self {
        let entries: Vec<FeedbackEntry> = store.load_json_or_default(FEEDBACK_KEY).await;
        tracing::debug!(tenant = store.tenant(), entries = entries.len(), "feedback log loaded");
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            store,
            cache,
            entries: RwLock::new(entries),
            persist_lock: tokio::sync::Mutex::new(()),
            events,
        }
    }

    /// Append a feedback entry. Never fails: a storage error is logged and the
    /// in-memory log still carries the entry.
    pub async fn record(
        &self,
        customer_id: &str,
        original_prediction: AnalysisResult,
        corrected_emotion: Option<Emotion>,
        corrected_sentiment: Option<SentimentLabel>,
        original_text: Option<String>,
    ) -> FeedbackEntry {
        let entry = FeedbackEntry {
            timestamp: Utc::now(),
            customer_id: customer_id.to_string(),
            original_prediction,
            corrected_emotion,
            corrected_sentiment,
            original_text,
            was_correct: corrected_emotion.is_none() && corrected_sentiment.is_none(),
        };

        self.write().push(entry.clone());
        self.persist().await;

        let patch_text = entry
            .original_text
            .as_deref()
            .filter(|t| !text_key(t).is_empty());
        if let (Some(text), true) = (patch_text, entry.has_correction()) {
            let patched = self
                .cache
                .patch(text, entry.corrected_emotion, entry.corrected_sentiment)
                .await;
            tracing::debug!(patched, "cache patched from feedback");
        }

        metrics::counter!(
            "feedback_recorded_total",
            "was_correct" => if entry.was_correct { "true" } else { "false" }
        )
        .increment(1);
        tracing::info!(
            customer_id = %entry.customer_id,
            was_correct = entry.was_correct,
            "feedback recorded"
        );

        // No receivers is fine.
        let _ = self.events.send(FeedbackEvent::Updated {
            customer_id: entry.customer_id.clone(),
            was_correct: entry.was_correct,
            timestamp: entry.timestamp,
        });

        entry
    }

    /// All entries, newest first.
    pub fn get_all(&self) -> Vec<FeedbackEntry> {
        let mut all = self.read().clone();
        all.reverse();
        all
    }

    /// Corrected result for `text` from the newest matching entry that carries
    /// a correction. Matching uses the same trimmed, case-sensitive key as the cache.
    pub fn find_correction_for(&self, text: &str) -> Option<AnalysisResult> {
        let key = text_key(text);
        if key.is_empty() {
            return None;
        }
        self.read()
            .iter()
            .rev()
            .find(|e| e.has_correction() && e.original_text.as_deref().map(text_key) == Some(key))
            .map(FeedbackEntry::corrected_result)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedbackEvent> {
        self.events.subscribe()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn persist(&self) {
        let _ordered = self.persist_lock.lock().await;
        let snapshot = self.read().clone();
        if let Err(e) = self.store.save_json(FEEDBACK_KEY, &snapshot).await {
            tracing::warn!(tenant = self.store.tenant(), error = %e, "failed to persist feedback log");
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<FeedbackEntry>> {
        match self.entries.read() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<FeedbackEntry>> {
        match self.entries.write() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}
