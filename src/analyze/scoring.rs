//! Customer priority scoring.
//!
//! Three signals, each normalized to [0,1] before weighting:
//! - sentiment   : `1 - sentiment_score` (more negative = more urgent)
//! - emotion     : [`Emotion::impact`] of the dominant emotion
//! - interaction : `min(interaction_count / max_interactions, 1)`
//!
//! priority = 0.4*sentiment + 0.3*emotion + 0.3*interaction, clamped to [0,1].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::types::Emotion;
use crate::config::DEFAULT_MAX_INTERACTIONS;

pub const SENTIMENT_WEIGHT: f32 = 0.4;
pub const EMOTION_WEIGHT: f32 = 0.3;
pub const INTERACTION_WEIGHT: f32 = 0.3;

const HIGH_THRESHOLD: f32 = 0.7;
const MEDIUM_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityCategory {
    High,
    Medium,
    Low,
}

impl PriorityCategory {
    pub const ALL: [PriorityCategory; 3] = [
        PriorityCategory::High,
        PriorityCategory::Medium,
        PriorityCategory::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityCategory::High => "high",
            PriorityCategory::Medium => "medium",
            PriorityCategory::Low => "low",
        }
    }
}

impl fmt::Display for PriorityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorityCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(PriorityCategory::High),
            "medium" => Ok(PriorityCategory::Medium),
            "low" => Ok(PriorityCategory::Low),
            other => Err(format!("unknown priority category '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityScorer {
    max_interactions: u32,
}

impl Default for PriorityScorer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INTERACTIONS)
    }
}

impl PriorityScorer {
    /// `max_interactions == 0` is treated as the default of 10.
    pub fn new(max_interactions: u32) -> Self {
        let max_interactions = if max_interactions == 0 {
            DEFAULT_MAX_INTERACTIONS
        } else {
            max_interactions
        };
        Self { max_interactions }
    }

    pub fn max_interactions(&self) -> u32 {
        self.max_interactions
    }

    pub fn score(&self, sentiment_score: f32, dominant: Emotion, interaction_count: u32) -> f32 {
        score_with_max(sentiment_score, dominant, interaction_count, self.max_interactions)
    }

    pub fn categorize(&self, score: f32) -> PriorityCategory {
        categorize(score)
    }
}

/// Priority score in [0,1]. `sentiment_score` uses the higher-is-more-positive scale.
pub fn score_with_max(
    sentiment_score: f32,
    dominant: Emotion,
    interaction_count: u32,
    max_interactions: u32,
) -> f32 {
    let max = max_interactions.max(1) as f32;
    let sentiment = if sentiment_score.is_finite() {
        (1.0 - sentiment_score).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let interactions = (interaction_count as f32 / max).min(1.0);

    let raw = sentiment * SENTIMENT_WEIGHT
        + dominant.impact() * EMOTION_WEIGHT
        + interactions * INTERACTION_WEIGHT;
    raw.clamp(0.0, 1.0)
}

/// `> 0.7` → high, `> 0.3` → medium, else low. Boundaries fall into the lower category.
pub fn categorize(score: f32) -> PriorityCategory {
    if score > HIGH_THRESHOLD {
        PriorityCategory::High
    } else if score > MEDIUM_THRESHOLD {
        PriorityCategory::Medium
    } else {
        PriorityCategory::Low
    }
}
