// src/analyze/types.rs
//! Shared analysis types: emotions, sentiment labels and the canonical `AnalysisResult`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence stamped on results that a human has verified or corrected.
pub const VERIFIED_CONFIDENCE: f32 = 0.95;

/// Closed emotion vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Anger,
    Sadness,
    Fear,
    Surprise,
    Disgust,
    Trust,
    Frustration,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 9] = [
        Emotion::Joy,
        Emotion::Anger,
        Emotion::Sadness,
        Emotion::Fear,
        Emotion::Surprise,
        Emotion::Disgust,
        Emotion::Trust,
        Emotion::Frustration,
        Emotion::Neutral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Anger => "anger",
            Emotion::Sadness => "sadness",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
            Emotion::Disgust => "disgust",
            Emotion::Trust => "trust",
            Emotion::Frustration => "frustration",
            Emotion::Neutral => "neutral",
        }
    }

    /// Urgency weight used by the priority scorer (higher = follow up sooner).
    pub fn impact(self) -> f32 {
        match self {
            Emotion::Anger => 1.0,
            Emotion::Frustration => 0.9,
            Emotion::Sadness => 0.8,
            Emotion::Fear => 0.75,
            Emotion::Disgust => 0.7,
            Emotion::Surprise => 0.5,
            Emotion::Neutral => 0.5,
            Emotion::Joy => 0.3,
            Emotion::Trust => 0.2,
        }
    }

    /// Map a raw classifier label into the vocabulary. Unknown labels become `Neutral`.
    pub fn from_model_label(label: &str) -> Emotion {
        match label.trim().to_lowercase().as_str() {
            "joy" | "happy" | "happiness" => Emotion::Joy,
            "sadness" | "sad" => Emotion::Sadness,
            "anger" | "angry" => Emotion::Anger,
            "fear" | "scared" | "afraid" => Emotion::Fear,
            "disgust" => Emotion::Disgust,
            "surprise" | "surprised" => Emotion::Surprise,
            "frustration" | "frustrated" => Emotion::Frustration,
            "trust" => Emotion::Trust,
            _ => Emotion::Neutral,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionResult {
    pub emotion: Emotion,
    pub score: f32,
    pub confidence: f32,
}

/// Canonical output of the analysis pipeline.
///
/// `sentiment_score` is in [0,1], higher = more positive, 0.5 = neutral.
/// `emotions` is sorted by descending score and its head is `dominant_emotion`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub sentiment: SentimentLabel,
    pub sentiment_score: f32,
    pub emotions: Vec<EmotionResult>,
    pub dominant_emotion: Emotion,
    pub language: String,
    pub confidence_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
}

impl AnalysisResult {
    /// Fixed result for empty input and last-resort defaults.
    pub fn neutral_default() -> Self {
        Self {
            sentiment: SentimentLabel::Neutral,
            sentiment_score: 0.5,
            emotions: vec![EmotionResult {
                emotion: Emotion::Neutral,
                score: 1.0,
                confidence: 0.5,
            }],
            dominant_emotion: Emotion::Neutral,
            language: "en".to_string(),
            confidence_score: 0.5,
            original_text: None,
        }
    }

    /// Apply human corrections and stamp the result as verified.
    ///
    /// A corrected emotion is moved to the head of `emotions` so the
    /// dominant-emotion invariant keeps holding.
    pub fn apply_correction(
        &mut self,
        emotion: Option<Emotion>,
        sentiment: Option<SentimentLabel>,
    ) {
        if let Some(e) = emotion {
            let top = self.emotions.first().map(|r| r.score).unwrap_or(0.0);
            self.emotions.retain(|r| r.emotion != e);
            self.emotions.insert(
                0,
                EmotionResult {
                    emotion: e,
                    score: top.max(VERIFIED_CONFIDENCE),
                    confidence: VERIFIED_CONFIDENCE,
                },
            );
            self.dominant_emotion = e;
        }
        if let Some(s) = sentiment {
            self.sentiment = s;
        }
        self.confidence_score = VERIFIED_CONFIDENCE;
    }
}

/// Which pipeline stage produced a result. Diagnostic only; not part of the result body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Empty,
    Feedback,
    Cache,
    Model,
    Rules,
}

impl AnalysisSource {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisSource::Empty => "empty",
            AnalysisSource::Feedback => "feedback",
            AnalysisSource::Cache => "cache",
            AnalysisSource::Model => "model",
            AnalysisSource::Rules => "rules",
        }
    }

    pub fn used_fallback(self) -> bool {
        matches!(self, AnalysisSource::Rules)
    }
}

/// Result plus the stage that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub source: AnalysisSource,
}

/// Sort descending by score; ties keep their input order.
pub(crate) fn sort_emotions(emotions: &mut [EmotionResult]) {
    emotions.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_labels_map_through_synonyms() {
        assert_eq!(Emotion::from_model_label("happy"), Emotion::Joy);
        assert_eq!(Emotion::from_model_label("Scared"), Emotion::Fear);
        assert_eq!(Emotion::from_model_label("frustrated"), Emotion::Frustration);
        assert_eq!(Emotion::from_model_label("optimism"), Emotion::Neutral);
    }

    #[test]
    fn correction_moves_emotion_to_head() {
        let mut r = AnalysisResult::neutral_default();
        r.emotions.push(EmotionResult {
            emotion: Emotion::Anger,
            score: 0.2,
            confidence: 0.2,
        });
        r.apply_correction(Some(Emotion::Anger), Some(SentimentLabel::Negative));

        assert_eq!(r.dominant_emotion, Emotion::Anger);
        assert_eq!(r.emotions[0].emotion, Emotion::Anger);
        assert_eq!(r.emotions.len(), 2);
        assert!(r.emotions[0].score >= r.emotions[1].score);
        assert_eq!(r.sentiment, SentimentLabel::Negative);
        assert_eq!(r.confidence_score, VERIFIED_CONFIDENCE);
    }

    #[test]
    fn serializes_camel_case_lowercase_enums() {
        let v = serde_json::to_value(AnalysisResult::neutral_default()).unwrap();
        assert_eq!(v["dominantEmotion"], "neutral");
        assert_eq!(v["sentimentScore"], 0.5);
        assert!(v.get("originalText").is_none());
    }
}
