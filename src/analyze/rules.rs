// src/analyze/rules.rs
//! Keyword-matching sentiment/emotion engine: the guaranteed fallback when no
//! model is available.
//!
//! Matching is plain substring search over the lower-cased text, so a keyword
//! embedded in a longer word also counts, and every occurrence counts.
//!
//! Keyword sets can be overridden from a JSON file (same field names as
//! [`KeywordLexicon`]); missing fields keep the built-in lists. The file is
//! hot-reloaded on mtime change at each `current()` call.

use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
    time::SystemTime,
};

use super::language;
use super::types::{sort_emotions, AnalysisResult, Emotion, EmotionResult, SentimentLabel};

/// Per-match increment for the negative set (feeds `anger`).
pub const NEGATIVE_INCREMENT: f32 = 0.2;
/// Per-match increment for every other set.
pub const SIGNAL_INCREMENT: f32 = 0.3;
/// Below this top score the text is considered to carry no strong signal.
const WEAK_SIGNAL: f32 = 0.2;
const NEUTRAL_BOOST: f32 = 0.3;
/// Cap on counted hits when turning tallies into a sentiment score.
const COUNT_CAP: usize = 5;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeywordLexicon {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub fear: Vec<String>,
    pub trust: Vec<String>,
    pub surprise: Vec<String>,
    pub disgust: Vec<String>,
    pub sadness: Vec<String>,
    pub frustration: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for KeywordLexicon {
    fn default() -> Self {
        Self {
            positive: words(&[
                "good", "great", "excellent", "amazing", "wonderful", "fantastic", "awesome",
                "love", "glad", "satisfied", "perfect", "pleased", "delighted", "thank",
                "recommend", "best", "gracias", "excelente", "bueno", "feliz", "encanta",
            ]),
            negative: words(&[
                "bad", "terrible", "awful", "horrible", "worst", "poor", "hate",
                "unacceptable", "frustrat", "problem", "issue", "broken", "fail",
                "complain", "angry", "furious", "ridiculous", "malo", "pésimo", "problema",
                "enojado",
            ]),
            fear: words(&[
                "afraid", "scared", "worried", "worry", "fear", "anxious", "nervous",
                "concerned", "miedo", "preocupado",
            ]),
            trust: words(&[
                "trust", "reliable", "confident", "depend on", "loyal", "secure", "confianza",
                "confiable",
            ]),
            surprise: words(&[
                "surpris", "unexpected", "wow", "shocked", "amazed", "astonish", "sorpresa",
            ]),
            disgust: words(&[
                "disgust", "gross", "nasty", "revolting", "sick of", "repulsive", "asco",
            ]),
            sadness: words(&[
                "sad", "disappoint", "sorry", "upset", "regret", "heartbroken", "triste",
                "lamentable",
            ]),
            frustration: words(&[
                "frustrat", "annoy", "delay", "waiting", "fed up", "still not", "again and again",
                "irritat", "harto", "molest",
            ]),
        }
    }
}

impl KeywordLexicon {
    /// Lower-case and trim every keyword; drop empties.
    fn normalized(mut self) -> Self {
        for set in [
            &mut self.positive,
            &mut self.negative,
            &mut self.fear,
            &mut self.trust,
            &mut self.surprise,
            &mut self.disgust,
            &mut self.sadness,
            &mut self.frustration,
        ] {
            let cleaned: Vec<String> = set
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            *set = cleaned;
        }
        self
    }
}

/// Load a lexicon file directly (no caching). Public for tests/tools.
pub fn load_lexicon_file(path: &Path) -> io::Result<KeywordLexicon> {
    let bytes = fs::read(path)?;
    let lex: KeywordLexicon = serde_json::from_slice(&bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(lex.normalized())
}

/// Hot-reload wrapper: reloads when the lexicon file mtime changes.
#[derive(Debug)]
pub struct HotReloadLexicon {
    path: PathBuf,
    inner: RwLock<State>,
}

#[derive(Debug)]
struct State {
    lexicon: Arc<KeywordLexicon>,
    last_modified: Option<SystemTime>,
}

impl HotReloadLexicon {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: RwLock::new(State {
                lexicon: Arc::new(KeywordLexicon::default()),
                last_modified: None,
            }),
        }
    }

    /// Latest lexicon, reloading if the file changed. A missing or invalid
    /// file keeps the previous (initially built-in) lexicon.
    pub fn current(&self) -> Arc<KeywordLexicon> {
        let mtime = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => return self.read_state().lexicon.clone(),
        };

        {
            let guard = self.read_state();
            if guard.last_modified == Some(mtime) {
                return guard.lexicon.clone();
            }
        }

        let mut guard = match self.inner.write() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        // Double-check in case another caller reloaded meanwhile.
        if guard.last_modified != Some(mtime) {
            match load_lexicon_file(&self.path) {
                Ok(lex) => {
                    tracing::info!(path = %self.path.display(), "keyword lexicon reloaded");
                    guard.lexicon = Arc::new(lex);
                }
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "keyword lexicon reload failed; keeping previous");
                }
            }
            guard.last_modified = Some(mtime);
        }
        guard.lexicon.clone()
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, State> {
        match self.inner.read() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}

#[derive(Debug)]
enum LexiconSource {
    Fixed(Arc<KeywordLexicon>),
    Hot(HotReloadLexicon),
}

/// Rule-based engine. Always succeeds.
#[derive(Debug)]
pub struct RuleBasedSentimentEngine {
    source: LexiconSource,
}

impl Default for RuleBasedSentimentEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleBasedSentimentEngine {
    /// Engine over the built-in keyword sets.
    pub fn new() -> Self {
        Self::with_lexicon(KeywordLexicon::default())
    }

    pub fn with_lexicon(lexicon: KeywordLexicon) -> Self {
        Self {
            source: LexiconSource::Fixed(Arc::new(lexicon.normalized())),
        }
    }

    /// Engine whose keyword sets follow a hot-reloaded JSON file.
    pub fn hot_reload(path: impl Into<PathBuf>) -> Self {
        Self {
            source: LexiconSource::Hot(HotReloadLexicon::new(path)),
        }
    }

    pub fn lexicon(&self) -> Arc<KeywordLexicon> {
        match &self.source {
            LexiconSource::Fixed(l) => l.clone(),
            LexiconSource::Hot(h) => h.current(),
        }
    }

    pub fn analyze(&self, text: &str) -> AnalysisResult {
        let lexicon = self.lexicon();
        analyze_with(&lexicon, text)
    }
}

fn count_hits(text: &str, set: &[String]) -> usize {
    set.iter().map(|k| text.matches(k.as_str()).count()).sum()
}

/// Pure scoring over a given lexicon.
pub fn analyze_with(lexicon: &KeywordLexicon, text: &str) -> AnalysisResult {
    let lower = text.to_lowercase();

    let positive = count_hits(&lower, &lexicon.positive);
    let negative = count_hits(&lower, &lexicon.negative);
    let fear = count_hits(&lower, &lexicon.fear);
    let trust = count_hits(&lower, &lexicon.trust);
    let surprise = count_hits(&lower, &lexicon.surprise);
    let disgust = count_hits(&lower, &lexicon.disgust);
    let sadness = count_hits(&lower, &lexicon.sadness);
    let frustration = count_hits(&lower, &lexicon.frustration);

    let positive_count = positive + trust;
    let negative_count = negative + fear + disgust + sadness + frustration;

    let acc = |hits: usize, inc: f32| hits as f32 * inc;
    // Same order as `Emotion::ALL`; ties keep this order after sorting.
    let raw: [(Emotion, f32); 9] = [
        (Emotion::Joy, acc(positive, SIGNAL_INCREMENT)),
        (Emotion::Anger, acc(negative, NEGATIVE_INCREMENT)),
        (Emotion::Sadness, acc(sadness, SIGNAL_INCREMENT)),
        (Emotion::Fear, acc(fear, SIGNAL_INCREMENT)),
        (Emotion::Surprise, acc(surprise, SIGNAL_INCREMENT)),
        (Emotion::Disgust, acc(disgust, SIGNAL_INCREMENT)),
        (Emotion::Trust, acc(trust, SIGNAL_INCREMENT)),
        (Emotion::Frustration, acc(frustration, SIGNAL_INCREMENT)),
        (Emotion::Neutral, 0.0),
    ];

    let (sentiment, sentiment_score) = if positive_count > negative_count {
        (
            SentimentLabel::Positive,
            0.5 + positive_count.min(COUNT_CAP) as f32 / 10.0,
        )
    } else if negative_count > positive_count {
        (
            SentimentLabel::Negative,
            0.5 - negative_count.min(COUNT_CAP) as f32 / 10.0,
        )
    } else {
        (SentimentLabel::Neutral, 0.5)
    };

    let confidence_score = raw.iter().map(|(_, s)| *s).fold(0.0f32, f32::max).min(1.0);

    let mut emotions: Vec<EmotionResult> = raw
        .iter()
        .map(|(emotion, s)| EmotionResult {
            emotion: *emotion,
            score: *s,
            confidence: *s,
        })
        .collect();
    // Rank on raw accumulators, then cap. Capping is monotonic so order holds.
    sort_emotions(&mut emotions);
    for e in &mut emotions {
        e.score = e.score.clamp(0.0, 1.0);
        e.confidence = e.score;
    }

    if emotions[0].score < WEAK_SIGNAL {
        if let Some(n) = emotions.iter_mut().find(|e| e.emotion == Emotion::Neutral) {
            n.score = NEUTRAL_BOOST;
            n.confidence = NEUTRAL_BOOST;
        }
        sort_emotions(&mut emotions);
    }

    AnalysisResult {
        sentiment,
        sentiment_score,
        dominant_emotion: emotions[0].emotion,
        emotions,
        language: language::detect(text).to_string(),
        confidence_score,
        original_text: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io::Write, thread, time::Duration};

    #[test]
    fn frustrated_complaint_is_negative_frustration() {
        let engine = RuleBasedSentimentEngine::new();
        let r = engine.analyze("I am extremely frustrated with the delays, this is unacceptable");
        assert_eq!(r.sentiment, SentimentLabel::Negative);
        assert_eq!(r.dominant_emotion, Emotion::Frustration);
        assert!((r.sentiment_score - 0.1).abs() < 1e-6);
        assert!((r.confidence_score - 0.6).abs() < 1e-6);
        assert_eq!(r.language, "en");
    }

    #[test]
    fn no_signal_boosts_neutral() {
        let r = RuleBasedSentimentEngine::new().analyze("The parcel arrived on Tuesday");
        assert_eq!(r.sentiment, SentimentLabel::Neutral);
        assert_eq!(r.sentiment_score, 0.5);
        assert_eq!(r.dominant_emotion, Emotion::Neutral);
        assert!((r.emotions[0].score - 0.3).abs() < 1e-6);
        // confidence reflects the raw accumulators, before the neutral boost
        assert_eq!(r.confidence_score, 0.0);
    }

    #[test]
    fn substring_matches_count() {
        // "goodness" contains "good", "bestseller" contains "best"
        let r = RuleBasedSentimentEngine::new().analyze("goodness, a bestseller");
        assert_eq!(r.sentiment, SentimentLabel::Positive);
        assert!((r.sentiment_score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn repeated_keywords_count_each_occurrence() {
        let r = RuleBasedSentimentEngine::new().analyze("bad bad bad");
        assert_eq!(r.sentiment, SentimentLabel::Negative);
        assert!((r.sentiment_score - 0.2).abs() < 1e-6);
        assert_eq!(r.dominant_emotion, Emotion::Anger);
    }

    #[test]
    fn score_is_capped_at_five_matches() {
        let engine = RuleBasedSentimentEngine::new();
        let five = engine.analyze("good good good good good");
        let eight = engine.analyze("good good good good good good good good");
        assert!((five.sentiment_score - 1.0).abs() < 1e-6);
        assert_eq!(five.sentiment_score, eight.sentiment_score);
        assert!(eight.emotions[0].score <= 1.0);
        assert!(eight.confidence_score <= 1.0);
    }

    #[test]
    fn saturated_sets_rank_by_raw_hits() {
        let engine = RuleBasedSentimentEngine::new();
        let r = engine.analyze("good good good good delay delay delay delay delay");
        assert_eq!(r.sentiment, SentimentLabel::Negative);
        assert_eq!(r.dominant_emotion, Emotion::Frustration);
        assert_eq!(r.emotions[0].emotion, Emotion::Frustration);
        assert_eq!(r.emotions[1].emotion, Emotion::Joy);
        assert!(r.emotions.iter().all(|e| (0.0..=1.0).contains(&e.score)));
        assert!(r.emotions.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn more_positive_keywords_never_lower_the_score() {
        let engine = RuleBasedSentimentEngine::new();
        let mut prev = f32::MIN;
        for n in 0..8 {
            let text = format!("{} the order was bad", "great ".repeat(n));
            let r = engine.analyze(&text);
            assert!(r.sentiment_score >= prev, "n={n}: {} < {prev}", r.sentiment_score);
            prev = r.sentiment_score;
        }
    }

    #[test]
    fn same_text_same_result() {
        let engine = RuleBasedSentimentEngine::new();
        let t = "Worried about the delay but I trust you";
        assert_eq!(engine.analyze(t), engine.analyze(t));
    }

    #[test]
    fn spanish_keywords_and_language() {
        let r = RuleBasedSentimentEngine::new().analyze("¡Excelente servicio, muchas gracias!");
        assert_eq!(r.language, "es");
        assert_eq!(r.sentiment, SentimentLabel::Positive);
        assert_eq!(r.dominant_emotion, Emotion::Joy);
    }

    #[test]
    fn tie_is_neutral() {
        let r = RuleBasedSentimentEngine::new().analyze("good but bad");
        assert_eq!(r.sentiment, SentimentLabel::Neutral);
        assert_eq!(r.sentiment_score, 0.5);
    }

    #[test]
    fn custom_lexicon_is_normalized() {
        let lex = KeywordLexicon {
            positive: vec!["  SUPERB ".into(), "".into()],
            ..KeywordLexicon::default()
        };
        let r = RuleBasedSentimentEngine::with_lexicon(lex).analyze("Superb work");
        assert_eq!(r.sentiment, SentimentLabel::Positive);
    }

    fn unique_tmp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        dir.push(format!("lexicon_test_{}", nanos));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn hot_reload_picks_up_new_keywords() {
        let tmpdir = unique_tmp_dir();
        let path = tmpdir.join("keywords.json");
        {
            let mut f = fs::File::create(&path).unwrap();
            write!(f, r#"{{"positive":["stellar"]}}"#).unwrap();
            f.sync_all().unwrap();
        }

        let engine = RuleBasedSentimentEngine::hot_reload(&path);
        let r1 = engine.analyze("stellar support");
        assert_eq!(r1.sentiment, SentimentLabel::Positive);
        // untouched sets keep the built-in words
        assert_eq!(engine.analyze("terrible").sentiment, SentimentLabel::Negative);

        // Ensure different mtime (coarse filesystem granularity).
        thread::sleep(Duration::from_millis(1100));
        {
            let mut f = fs::File::create(&path).unwrap();
            write!(f, r#"{{"positive":["splendid"]}}"#).unwrap();
            f.sync_all().unwrap();
        }

        assert_eq!(
            engine.analyze("stellar support").sentiment,
            SentimentLabel::Neutral
        );
        assert_eq!(
            engine.analyze("splendid support").sentiment,
            SentimentLabel::Positive
        );

        let _ = fs::remove_dir_all(&tmpdir);
    }

    #[test]
    fn missing_lexicon_file_uses_builtin() {
        let engine = RuleBasedSentimentEngine::hot_reload("does/not/exist.json");
        assert_eq!(engine.analyze("great").sentiment, SentimentLabel::Positive);
    }
}
