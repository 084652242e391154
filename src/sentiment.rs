// src/sentiment.rs
//! Quick dictionary sentiment on a signed polarity scale.
//!
//! This is a separate, lighter scale from the pipeline's `sentiment_score`
//! (which lives in [0,1] with 0.5 neutral). The score here is a [`Polarity`]
//! in [-1,1] with 0 neutral, so the two cannot be mixed up by accident.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::analyze::types::SentimentLabel;

static POSITIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "good", "great", "excellent", "amazing", "wonderful", "fantastic", "terrific",
        "outstanding", "superb", "awesome", "nice", "love", "happy", "satisfied", "perfect",
        "brilliant", "impressive", "exceptional", "delighted", "pleased", "thank", "thanks",
        "like", "enjoy", "excited", "recommend", "best",
    ]
    .into_iter()
    .collect()
});

static NEGATIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bad", "poor", "terrible", "awful", "horrible", "disappointing", "frustrating",
        "unsatisfied", "dissatisfied", "unhappy", "sorry", "hate", "dislike", "worst",
        "mistake", "annoying", "problem", "issue", "fail", "failure", "complaint", "complain",
        "disappointed", "upset", "regret", "sad", "angry", "broken",
    ]
    .into_iter()
    .collect()
});

const LABEL_THRESHOLD: f32 = 0.1;
/// Denominator floor so very short texts do not swing to the extremes.
const MIN_WORDS: usize = 5;

/// Signed polarity in [-1,1]; 0 is neutral.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polarity(f32);

impl Polarity {
    pub fn new(v: f32) -> Self {
        if v.is_finite() {
            Self(v.clamp(-1.0, 1.0))
        } else {
            Self(0.0)
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuickSentiment {
    pub sentiment: SentimentLabel,
    pub score: Polarity,
    pub confidence: f32,
}

impl QuickSentiment {
    fn neutral() -> Self {
        Self {
            sentiment: SentimentLabel::Neutral,
            score: Polarity::default(),
            confidence: 0.0,
        }
    }
}

/// Word tokens (letters, digits, underscore), lower-cased.
pub(crate) fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

pub fn quick_sentiment(text: &str) -> QuickSentiment {
    let mut words = 0usize;
    let mut positive = 0usize;
    let mut negative = 0usize;

    for w in tokenize(text) {
        words += 1;
        if POSITIVE_WORDS.contains(w.as_str()) {
            positive += 1;
        } else if NEGATIVE_WORDS.contains(w.as_str()) {
            negative += 1;
        }
    }

    if words == 0 {
        return QuickSentiment::neutral();
    }

    let score = Polarity::new((positive as f32 - negative as f32) / words.max(MIN_WORDS) as f32);
    let confidence = ((positive + negative) as f32 / words as f32 * 2.0).min(1.0);

    let sentiment = if score.value() > LABEL_THRESHOLD {
        SentimentLabel::Positive
    } else if score.value() < -LABEL_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    };

    QuickSentiment {
        sentiment,
        score,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_punctuation_is_neutral_zero() {
        for t in ["", "   ", "?!..."] {
            let r = quick_sentiment(t);
            assert_eq!(r.sentiment, SentimentLabel::Neutral);
            assert_eq!(r.score.value(), 0.0);
            assert_eq!(r.confidence, 0.0);
        }
    }

    #[test]
    fn short_positive_uses_min_denominator() {
        // 1 positive out of 2 words → 1/5
        let r = quick_sentiment("Great service");
        assert_eq!(r.sentiment, SentimentLabel::Positive);
        assert!((r.score.value() - 0.2).abs() < 1e-6);
        assert_eq!(r.confidence, 1.0);
    }

    #[test]
    fn negative_words_pull_score_down() {
        let r = quick_sentiment("The app is broken and support was terrible, I hate it");
        assert_eq!(r.sentiment, SentimentLabel::Negative);
        assert!(r.score.value() < -0.1);
        assert!((0.0..=1.0).contains(&r.confidence));
    }

    #[test]
    fn whole_words_only() {
        // "goodness" is not "good"; "unhappy" is a negative word on its own.
        let r = quick_sentiment("goodness unhappy");
        assert!(r.score.value() < 0.0);
    }

    #[test]
    fn polarity_is_clamped() {
        assert_eq!(Polarity::new(3.0).value(), 1.0);
        assert_eq!(Polarity::new(f32::NAN).value(), 0.0);
    }
}
