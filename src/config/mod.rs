// src/config/mod.rs
//! Engine configuration loaded from TOML.
//!
//! Path resolution: `$ENGINE_CONFIG_PATH`, else `config/engine.toml`. A missing
//! default file yields built-in defaults; an explicitly configured path must exist.

pub mod model;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use model::ModelConfig;

pub const DEFAULT_ENGINE_CONFIG_PATH: &str = "config/engine.toml";
pub const ENV_ENGINE_CONFIG_PATH: &str = "ENGINE_CONFIG_PATH";
pub const ENV_ENGINE_TENANT: &str = "ENGINE_TENANT";
pub const ENV_ENGINE_STATE_DIR: &str = "ENGINE_STATE_DIR";

pub const DEFAULT_MAX_INTERACTIONS: u32 = 10;

fn default_tenant() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Namespace for all persisted state (company id in the CRM).
    #[serde(default = "default_tenant")]
    pub tenant: String,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub priority: PriorityConfig,
    #[serde(default)]
    pub lexicon: LexiconConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tenant: default_tenant(),
            storage: StorageConfig::default(),
            model: ModelConfig::default(),
            priority: PriorityConfig::default(),
            lexicon: LexiconConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_state_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            dir: default_state_dir(),
        }
    }
}

fn default_max_interactions() -> u32 {
    DEFAULT_MAX_INTERACTIONS
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriorityConfig {
    /// Interaction count at which the interaction signal saturates.
    #[serde(default = "default_max_interactions")]
    pub max_interactions: u32,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            max_interactions: DEFAULT_MAX_INTERACTIONS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LexiconConfig {
    /// Optional JSON keyword file, hot-reloaded on change.
    pub path: Option<PathBuf>,
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: EngineConfig = toml::from_str(s).context("parsing engine config TOML")?;
        cfg.sanitized()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading engine config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $ENGINE_CONFIG_PATH (must exist)
    /// 2) config/engine.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_ENGINE_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("ENGINE_CONFIG_PATH points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_ENGINE_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from_file(&default_p)?
            } else {
                Self::default().sanitized()?
            }
        };

        if let Ok(t) = std::env::var(ENV_ENGINE_TENANT) {
            if !t.trim().is_empty() {
                cfg.tenant = t.trim().to_string();
            }
        }
        if let Ok(d) = std::env::var(ENV_ENGINE_STATE_DIR) {
            if !d.trim().is_empty() {
                cfg.storage.dir = PathBuf::from(d.trim());
            }
        }
        Ok(cfg)
    }

    fn sanitized(mut self) -> Result<Self> {
        self.tenant = self.tenant.trim().to_string();
        if self.tenant.is_empty() {
            self.tenant = default_tenant();
        }
        if self.priority.max_interactions == 0 {
            self.priority.max_interactions = DEFAULT_MAX_INTERACTIONS;
        }
        self.model = self.model.resolved()?;
        Ok(self)
    }
}
