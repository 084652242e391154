// src/report.rs
//! Aggregate views for dashboards.
//!
//! The first group works on prioritized customer rows; `feedback_summary` and
//! `word_frequencies` work on raw texts scored with the quick polarity helper.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::analyze::language;
use crate::analyze::scoring::PriorityCategory;
use crate::analyze::types::{Emotion, SentimentLabel};
use crate::customers::CustomerAnalysisData;
use crate::sentiment::{quick_sentiment, Polarity};

pub const DEFAULT_TOP_WORDS: usize = 20;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("static regex"));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
        "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
        "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
        "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
        "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
        "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
        "for", "with", "about", "against", "between", "into", "through", "during", "before",
        "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
        "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
        "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
        "nor", "not", "only", "own", "same", "so", "than", "too", "very", "can", "will", "just",
        "don", "should", "now", "ain", "aren", "couldn", "didn", "doesn", "hadn", "hasn",
        "haven", "isn", "mightn", "mustn", "needn", "shan", "shouldn", "wasn", "weren", "won",
        "wouldn",
    ]
    .into_iter()
    .collect()
});

// ------------------------------------------------------------
// Customer-row views
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionCount {
    pub emotion: Emotion,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityBucket {
    pub category: PriorityCategory,
    pub count: usize,
    /// Dominant-emotion counts within the bucket, every emotion present.
    pub emotions: Vec<EmotionCount>,
}

pub fn priority_breakdown(rows: &[CustomerAnalysisData]) -> Vec<PriorityBucket> {
    PriorityCategory::ALL
        .iter()
        .map(|&category| {
            let in_bucket: Vec<&CustomerAnalysisData> =
                rows.iter().filter(|r| r.priority_category == category).collect();
            PriorityBucket {
                category,
                count: in_bucket.len(),
                emotions: count_emotions(in_bucket.iter().map(|r| r.dominant_emotion)),
            }
        })
        .collect()
}

/// Dominant-emotion counts across all rows, all nine emotions present.
pub fn emotion_distribution(rows: &[CustomerAnalysisData]) -> Vec<EmotionCount> {
    count_emotions(rows.iter().map(|r| r.dominant_emotion))
}

fn count_emotions(it: impl Iterator<Item = Emotion>) -> Vec<EmotionCount> {
    let mut counts: HashMap<Emotion, usize> = HashMap::new();
    for e in it {
        *counts.entry(e).or_insert(0) += 1;
    }
    Emotion::ALL
        .iter()
        .map(|&emotion| EmotionCount {
            emotion,
            count: counts.get(&emotion).copied().unwrap_or(0),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageCount {
    pub code: String,
    pub name: String,
    pub count: usize,
}

/// Rows per language code, most common first (ties by code).
pub fn language_distribution(rows: &[CustomerAnalysisData]) -> Vec<LanguageCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for r in rows {
        *counts.entry(r.language.as_str()).or_insert(0) += 1;
    }
    let mut out: Vec<LanguageCount> = counts
        .into_iter()
        .map(|(code, count)| LanguageCount {
            code: code.to_string(),
            name: language::display_name(code).to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.code.cmp(&b.code)));
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTrend {
    pub date: NaiveDate,
    /// Mean `sentiment_score`, two decimals.
    pub avg_sentiment: f32,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub count: usize,
}

/// One point per UTC calendar day, oldest first.
pub fn daily_trends(rows: &[CustomerAnalysisData]) -> Vec<DailyTrend> {
    let mut days: BTreeMap<NaiveDate, Vec<&CustomerAnalysisData>> = BTreeMap::new();
    for r in rows {
        days.entry(r.timestamp.date_naive()).or_default().push(r);
    }
    days.into_iter()
        .map(|(date, items)| {
            let total: f32 = items.iter().map(|r| r.sentiment_score).sum();
            let by = |label: SentimentLabel| items.iter().filter(|r| r.sentiment == label).count();
            DailyTrend {
                date,
                avg_sentiment: round2(total / items.len() as f32),
                positive: by(SentimentLabel::Positive),
                neutral: by(SentimentLabel::Neutral),
                negative: by(SentimentLabel::Negative),
                count: items.len(),
            }
        })
        .collect()
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

// ------------------------------------------------------------
// Raw-text views (quick polarity scale)
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSummary {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub total: usize,
    pub positive_pct: u32,
    pub negative_pct: u32,
    pub neutral_pct: u32,
    pub average_score: Polarity,
}

pub fn feedback_summary<S: AsRef<str>>(texts: &[S]) -> FeedbackSummary {
    let mut positive = 0;
    let mut negative = 0;
    let mut neutral = 0;
    let mut sum = 0.0f32;
    for t in texts {
        let q = quick_sentiment(t.as_ref());
        sum += q.score.value();
        match q.sentiment {
            SentimentLabel::Positive => positive += 1,
            SentimentLabel::Negative => negative += 1,
            SentimentLabel::Neutral => neutral += 1,
        }
    }
    let total = texts.len();
    let pct = |n: usize| {
        if total == 0 {
            0
        } else {
            (n as f32 / total as f32 * 100.0).round() as u32
        }
    };
    FeedbackSummary {
        positive,
        negative,
        neutral,
        total,
        positive_pct: pct(positive),
        negative_pct: pct(negative),
        neutral_pct: pct(neutral),
        average_score: if total == 0 {
            Polarity::default()
        } else {
            Polarity::new(sum / total as f32)
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCount {
    pub text: String,
    pub value: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WordFrequencies {
    pub positive: Vec<WordCount>,
    pub negative: Vec<WordCount>,
    pub neutral: Vec<WordCount>,
}

/// Most frequent content words per quick-sentiment label.
pub fn word_frequencies<S: AsRef<str>>(texts: &[S], top_n: usize) -> WordFrequencies {
    let mut buckets: [HashMap<String, usize>; 3] = Default::default();
    for t in texts {
        let text = t.as_ref();
        let idx = match quick_sentiment(text).sentiment {
            SentimentLabel::Positive => 0,
            SentimentLabel::Negative => 1,
            SentimentLabel::Neutral => 2,
        };
        count_words(text, &mut buckets[idx]);
    }
    let [pos, neg, neu] = buckets;
    WordFrequencies {
        positive: top_words(pos, top_n),
        negative: top_words(neg, top_n),
        neutral: top_words(neu, top_n),
    }
}

fn count_words(text: &str, counts: &mut HashMap<String, usize>) {
    let lower = text.to_lowercase();
    for m in WORD_RE.find_iter(&lower) {
        let w = m.as_str();
        if w.chars().count() > 2 && !STOPWORDS.contains(w) {
            *counts.entry(w.to_string()).or_insert(0) += 1;
        }
    }
}

fn top_words(counts: HashMap<String, usize>, n: usize) -> Vec<WordCount> {
    let mut v: Vec<WordCount> = counts
        .into_iter()
        .map(|(text, value)| WordCount { text, value })
        .collect();
    v.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.text.cmp(&b.text)));
    v.truncate(n);
    v
}

/// Everything `GET /report` returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub priority: Vec<PriorityBucket>,
    pub emotions: Vec<EmotionCount>,
    pub languages: Vec<LanguageCount>,
    pub trends: Vec<DailyTrend>,
    pub feedback: FeedbackSummary,
    pub words: WordFrequencies,
}

impl Report {
    pub fn build<S: AsRef<str>>(rows: &[CustomerAnalysisData], texts: &[S]) -> Self {
        Self {
            priority: priority_breakdown(rows),
            emotions: emotion_distribution(rows),
            languages: language_distribution(rows),
            trends: daily_trends(rows),
            feedback: feedback_summary(texts),
            words: word_frequencies(texts, DEFAULT_TOP_WORDS),
        }
    }
}
