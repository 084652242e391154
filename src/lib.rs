// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod api;
pub mod cache;
pub mod config;
pub mod customers;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod metrics;
pub mod report;
pub mod sentiment;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{Analysis, AnalysisResult, AnalysisSource, Analyzer, Emotion, SentimentLabel};
pub use crate::api::router;
pub use crate::config::EngineConfig;
pub use crate::engine::Engine;
