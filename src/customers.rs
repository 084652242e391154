// src/customers.rs
//! Per-customer message log and the prioritization pass over it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::analyze::scoring::{PriorityCategory, PriorityScorer};
use crate::analyze::types::{AnalysisResult, Emotion, EmotionResult, SentimentLabel};
use crate::analyze::Analyzer;
use crate::store::{ScopedStore, MESSAGES_KEY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerMessage {
    pub customer_id: String,
    pub customer_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only log of inbound customer messages for one tenant.
pub struct MessageLog {
    store: ScopedStore,
    entries: RwLock<Vec<CustomerMessage>>,
    persist_lock: tokio::sync::Mutex<()>,
}

impl MessageLog {
    pub async fn open(store: ScopedStore) -> Self {
        let entries: Vec<CustomerMessage> = store.load_json_or_default(MESSAGES_KEY).await;
        Self {
            store,
            entries: RwLock::new(entries),
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub async fn append(&self, customer_id: &str, customer_name: &str, text: &str) -> CustomerMessage {
        let message = CustomerMessage {
            customer_id: customer_id.trim().to_string(),
            customer_name: customer_name.trim().to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        self.write().push(message.clone());

        let _ordered = self.persist_lock.lock().await;
        let snapshot = self.read().clone();
        if let Err(e) = self.store.save_json(MESSAGES_KEY, &snapshot).await {
            tracing::warn!(tenant = self.store.tenant(), error = %e, "failed to persist message log");
        }
        message
    }

    pub fn interaction_count(&self, customer_id: &str) -> u32 {
        let n = self
            .read()
            .iter()
            .filter(|m| m.customer_id == customer_id)
            .count();
        u32::try_from(n).unwrap_or(u32::MAX)
    }

    /// Newest message per customer, ordered by customer id.
    /// Equal timestamps resolve to the later log entry.
    pub fn latest_by_customer(&self) -> Vec<CustomerMessage> {
        let guard = self.read();
        let mut latest: HashMap<&str, &CustomerMessage> = HashMap::new();
        for m in guard.iter() {
            match latest.get(m.customer_id.as_str()) {
                Some(prev) if prev.timestamp > m.timestamp => {}
                _ => {
                    latest.insert(m.customer_id.as_str(), m);
                }
            }
        }
        let mut out: Vec<CustomerMessage> = latest.into_values().cloned().collect();
        out.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));
        out
    }

    pub fn all(&self) -> Vec<CustomerMessage> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<CustomerMessage>> {
        match self.entries.read() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<CustomerMessage>> {
        match self.entries.write() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}

/// One row of the follow-up list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAnalysisData {
    pub customer_id: String,
    pub customer_name: String,
    pub customer_initials: String,
    pub sentiment: SentimentLabel,
    pub sentiment_score: f32,
    pub dominant_emotion: Emotion,
    pub emotions: Vec<EmotionResult>,
    pub interaction_count: u32,
    pub priority_score: f32,
    pub priority_category: PriorityCategory,
    pub language: String,
    pub last_message: String,
    pub timestamp: DateTime<Utc>,
}

impl CustomerAnalysisData {
    pub fn build(
        message: &CustomerMessage,
        analysis: AnalysisResult,
        interaction_count: u32,
        scorer: &PriorityScorer,
    ) -> Self {
        let priority_score = scorer.score(
            analysis.sentiment_score,
            analysis.dominant_emotion,
            interaction_count,
        );
        Self {
            customer_id: message.customer_id.clone(),
            customer_name: message.customer_name.clone(),
            customer_initials: customer_initials(&message.customer_name),
            sentiment: analysis.sentiment,
            sentiment_score: analysis.sentiment_score,
            dominant_emotion: analysis.dominant_emotion,
            emotions: analysis.emotions,
            interaction_count,
            priority_score,
            priority_category: scorer.categorize(priority_score),
            language: analysis.language,
            last_message: message.text.clone(),
            timestamp: message.timestamp,
        }
    }
}

/// First letter of up to two words of `name`, uppercased. `"?"` for a blank name.
pub fn customer_initials(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .take(2)
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_uppercase)
        .collect();
    if initials.is_empty() {
        "?".to_string()
    } else {
        initials
    }
}

/// Analyze each customer's newest message and rank customers by priority,
/// highest first. `filter` keeps only one category.
pub async fn prioritize(
    log: &MessageLog,
    analyzer: &Analyzer,
    scorer: &PriorityScorer,
    filter: Option<PriorityCategory>,
) -> Vec<CustomerAnalysisData> {
    let mut rows = Vec::new();
    for message in log.latest_by_customer() {
        let analysis = analyzer.analyze(&message.text).await;
        let count = log.interaction_count(&message.customer_id);
        let row = CustomerAnalysisData::build(&message, analysis, count, scorer);
        if filter.map_or(true, |c| c == row.priority_category) {
            rows.push(row);
        }
    }
    rows.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}
