// src/store/mod.rs
//! Keyed persistence standing in for browser storage.
//!
//! Values are JSON strings. Every logical key is scoped to a tenant as
//! `{key}_{tenant}`, so several companies can share one backend.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use crate::error::StorageError;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Logical key of the analysis cache.
pub const ANALYSIS_CACHE_KEY: &str = "analysis_cache";
/// Logical key of the feedback log.
pub const FEEDBACK_KEY: &str = "emotion_feedback_data";
/// Logical key of the per-customer message log.
pub const MESSAGES_KEY: &str = "customer_messages";

#[async_trait]
pub trait Storage: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// Replace the value under `key`. Each write is atomic; last writer wins.
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// A storage handle bound to one tenant namespace.
#[derive(Clone)]
pub struct ScopedStore {
    inner: Arc<dyn Storage>,
    tenant: String,
}

impl ScopedStore {
    pub fn new(inner: Arc<dyn Storage>, tenant: impl Into<String>) -> Self {
        Self {
            inner,
            tenant: tenant.into(),
        }
    }

    /// Unscoped in-memory store, handy for tests.
    pub fn in_memory(tenant: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryStorage::new()), tenant)
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn scoped_key(&self, key: &str) -> String {
        format!("{}_{}", key, self.tenant)
    }

    pub async fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(&self.scoped_key(key)).await
    }

    pub async fn put_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.put(&self.scoped_key(key), value).await
    }

    /// Read and decode a JSON value.
    pub async fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let scoped = self.scoped_key(key);
        match self.inner.get(&scoped).await? {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StorageError::Corrupt { key: scoped, source }),
        }
    }

    /// Read a JSON value, treating a missing, unreadable or corrupt value as `T::default()`.
    pub async fn load_json_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.load_json(key).await {
            Ok(Some(v)) => v,
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!(key, tenant = %self.tenant, error = %e, "stored value unreadable; starting empty");
                T::default()
            }
        }
    }

    /// Encode and write a JSON value.
    pub async fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
            key: self.scoped_key(key),
            source,
        })?;
        self.put_raw(key, &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keys_are_scoped_per_tenant() {
        let backend: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let a = ScopedStore::new(backend.clone(), "acme");
        let b = ScopedStore::new(backend.clone(), "globex");

        a.save_json("items", &vec![1, 2, 3]).await.unwrap();
        let got: Option<Vec<i32>> = a.load_json("items").await.unwrap();
        assert_eq!(got, Some(vec![1, 2, 3]));
        let other: Option<Vec<i32>> = b.load_json("items").await.unwrap();
        assert_eq!(other, None);

        assert_eq!(
            backend.get("items_acme").await.unwrap().as_deref(),
            Some("[1,2,3]")
        );
    }

    #[tokio::test]
    async fn corrupt_json_is_reported_and_defaulted() {
        let store = ScopedStore::in_memory("t");
        store.put_raw("items", "{not json").await.unwrap();

        let err = store.load_json::<Vec<i32>>("items").await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { ref key, .. } if key == "items_t"));

        let v: Vec<i32> = store.load_json_or_default("items").await;
        assert!(v.is_empty());
    }
}
