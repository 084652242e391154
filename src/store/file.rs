// src/store/file.rs
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::Storage;
use crate::error::StorageError;

/// One JSON file per key under `root`. Writes go to `*.json.tmp` and are
/// renamed into place, so readers never see a half-written file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", file_stem(key)))
    }
}

/// Keys map to safe file names. If any character had to be replaced, a short
/// hash of the original key is appended so distinct keys stay distinct.
fn file_stem(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut replaced = false;
    for c in key.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
            out.push(c);
        } else {
            out.push('_');
            replaced = true;
        }
    }
    if out.is_empty() || out.starts_with('.') {
        out.insert(0, '_');
        replaced = true;
    }
    if replaced {
        let digest = Sha256::digest(key.as_bytes());
        out.push('-');
        for b in digest.iter().take(6) {
            let _ = write!(&mut out, "{:02x}", b);
        }
    }
    out
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).await?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value.as_bytes()).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stems_are_safe_and_distinct() {
        assert_eq!(file_stem("analysis_cache_acme"), "analysis_cache_acme");
        let a = file_stem("analysis_cache_a/b");
        let b = file_stem("analysis_cache_a:b");
        assert!(a.starts_with("analysis_cache_a_b-"));
        assert_ne!(a, b);
        assert!(!file_stem("..").starts_with('.'));
    }

    #[tokio::test]
    async fn roundtrip_and_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStorage::new(tmp.path().join("state"));

        assert_eq!(store.get("k").await.unwrap(), None);
        store.put("k", r#"{"a":1}"#).await.unwrap();
        store.put("k", r#"{"a":2}"#).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some(r#"{"a":2}"#));
        assert!(!store.path_for("k").with_extension("json.tmp").exists());
    }
}
