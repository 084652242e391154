// src/cache.rs
//! Analysis cache keyed by message text.
//!
//! Lookups use the trimmed text with an exact, case-sensitive match (the
//! feedback store uses the same key). Entries are never evicted. The whole
//! map is written back to storage after every change.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::analyze::types::{AnalysisResult, Emotion, SentimentLabel};
use crate::store::{ScopedStore, ANALYSIS_CACHE_KEY};

/// Normalized lookup key shared by the cache and the feedback store.
pub fn text_key(text: &str) -> &str {
    text.trim()
}

/// Persisted form of one cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub text: String,
    pub analysis: AnalysisResult,
}

pub struct AnalysisCache {
    store: ScopedStore,
    entries: RwLock<HashMap<String, AnalysisResult>>,
    // Serializes write-back so the newest snapshot is the one that lands last.
    persist_lock: tokio::sync::Mutex<()>,
}

impl AnalysisCache {
    /// Open the cache, loading any persisted entries. Unreadable state starts empty.
    pub async fn open(store: ScopedStore) -> Self {
        let persisted: Vec<CacheEntry> = store.load_json_or_default(ANALYSIS_CACHE_KEY).await;
        let entries: HashMap<String, AnalysisResult> = persisted
            .into_iter()
            .map(|e| (text_key(&e.text).to_string(), e.analysis))
            .collect();
        tracing::debug!(tenant = store.tenant(), entries = entries.len(), "analysis cache loaded");
        Self {
            store,
            entries: RwLock::new(entries),
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn get(&self, text: &str) -> Option<AnalysisResult> {
        self.read().get(text_key(text)).cloned()
    }

    pub async fn put(&self, text: &str, result: AnalysisResult) {
        let key = text_key(text);
        if key.is_empty() {
            return;
        }
        self.write().insert(key.to_string(), result);
        self.persist().await;
    }

    /// Overwrite the cached labels for `text` and stamp the entry as verified.
    /// Returns `false` when there is no entry for `text`.
    pub async fn patch(
        &self,
        text: &str,
        emotion: Option<Emotion>,
        sentiment: Option<SentimentLabel>,
    ) -> bool {
        {
            let mut guard = self.write();
            match guard.get_mut(text_key(text)) {
                Some(entry) => entry.apply_correction(emotion, sentiment),
                None => return false,
            }
        }
        self.persist().await;
        true
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<CacheEntry> {
        let mut out: Vec<CacheEntry> = self
            .read()
            .iter()
            .map(|(text, analysis)| CacheEntry {
                text: text.clone(),
                analysis: analysis.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.text.cmp(&b.text));
        out
    }

    async fn persist(&self) {
        let _ordered = self.persist_lock.lock().await;
        let snapshot = self.entries();
        metrics::gauge!("analysis_cache_entries").set(snapshot.len() as f64);
        if let Err(e) = self.store.save_json(ANALYSIS_CACHE_KEY, &snapshot).await {
            tracing::warn!(tenant = self.store.tenant(), error = %e, "failed to persist analysis cache");
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, AnalysisResult>> {
        match self.entries.read() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, AnalysisResult>> {
        match self.entries.write() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::types::VERIFIED_CONFIDENCE;
    use crate::store::MemoryStorage;
    use std::sync::Arc;

    fn sample() -> AnalysisResult {
        AnalysisResult::neutral_default()
    }

    #[tokio::test]
    async fn put_get_uses_trimmed_exact_key() {
        let cache = AnalysisCache::open(ScopedStore::in_memory("t")).await;
        cache.put("  Hello ", sample()).await;

        assert!(cache.get("Hello").is_some());
        assert!(cache.get("Hello  ").is_some());
        assert!(cache.get("hello").is_none(), "lookup is case-sensitive");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn blank_text_is_not_cached() {
        let cache = AnalysisCache::open(ScopedStore::in_memory("t")).await;
        cache.put("   ", sample()).await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn patch_overwrites_labels_and_confidence() {
        let cache = AnalysisCache::open(ScopedStore::in_memory("t")).await;
        cache.put("late again", sample()).await;

        assert!(
            cache
                .patch("late again", Some(Emotion::Frustration), Some(SentimentLabel::Negative))
                .await
        );
        let r = cache.get("late again").unwrap();
        assert_eq!(r.dominant_emotion, Emotion::Frustration);
        assert_eq!(r.emotions[0].emotion, Emotion::Frustration);
        assert_eq!(r.sentiment, SentimentLabel::Negative);
        assert_eq!(r.confidence_score, VERIFIED_CONFIDENCE);

        assert!(!cache.patch("unknown", Some(Emotion::Joy), None).await);
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let backend = Arc::new(MemoryStorage::new());
        {
            let cache = AnalysisCache::open(ScopedStore::new(backend.clone(), "acme")).await;
            cache.put("persist me", sample()).await;
        }
        let reopened = AnalysisCache::open(ScopedStore::new(backend.clone(), "acme")).await;
        assert!(reopened.get("persist me").is_some());

        let other_tenant = AnalysisCache::open(ScopedStore::new(backend, "globex")).await;
        assert!(other_tenant.is_empty());
    }

    #[tokio::test]
    async fn corrupt_state_starts_empty() {
        let store = ScopedStore::in_memory("t");
        store.put_raw(ANALYSIS_CACHE_KEY, "[{broken").await.unwrap();
        let cache = AnalysisCache::open(store).await;
        assert!(cache.is_empty());
        cache.put("works", sample()).await;
        assert_eq!(cache.len(), 1);
    }
}
