// tests/analyze_pipeline.rs
//
// End-to-end behaviour of the analysis pipeline through the public Engine API.
//
// Covered:
// - feedback correction beats cache and engines
// - cache hit returns the identical result without recomputation
// - empty input never touches cache, feedback or model
// - frustrated complaint → negative/frustration → high priority
// - inference errors fall back per call; load errors disable the model for good
// - language heuristic on the canonical samples

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use customer_priority_engine::analyze::language;
use customer_priority_engine::analyze::model::{
    Classifier, ClassifierPair, DisabledLoader, LabelScore, ModelLoader, StaticClassifier,
};
use customer_priority_engine::analyze::scoring::{PriorityCategory, PriorityScorer};
use customer_priority_engine::analyze::types::VERIFIED_CONFIDENCE;
use customer_priority_engine::error::ModelError;
use customer_priority_engine::store::MemoryStorage;
use customer_priority_engine::{
    AnalysisResult, AnalysisSource, Emotion, Engine, EngineConfig, SentimentLabel,
};

const COMPLAINT: &str = "I am extremely frustrated with the delays, this is unacceptable";

async fn engine_with(loader: Arc<dyn ModelLoader>) -> Engine {
    Engine::with_parts(EngineConfig::default(), Arc::new(MemoryStorage::new()), loader).await
}

/// Emotion classifier that counts calls and answers "joy" unless told to fail.
struct CountingClassifier {
    calls: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl Classifier for CountingClassifier {
    async fn classify(&self, _text: &str, _top_k: usize) -> Result<Vec<LabelScore>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ModelError::Status(503));
        }
        Ok(vec![LabelScore::new("joy", 0.7), LabelScore::new("anger", 0.2)])
    }

    fn name(&self) -> &str {
        "counting"
    }
}

struct CountingLoader {
    calls: Arc<AtomicUsize>,
    loads: Arc<AtomicUsize>,
    fail_inference: bool,
    fail_load: bool,
}

impl CountingLoader {
    fn new(fail_inference: bool, fail_load: bool) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            loads: Arc::new(AtomicUsize::new(0)),
            fail_inference,
            fail_load,
        }
    }
}

#[async_trait]
impl ModelLoader for CountingLoader {
    async fn load(&self) -> Result<ClassifierPair, ModelError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load {
            return Err(ModelError::Unavailable("weights missing".into()));
        }
        Ok(ClassifierPair {
            sentiment: Arc::new(StaticClassifier::new(
                "sentiment",
                vec![LabelScore::new("POSITIVE", 0.8), LabelScore::new("NEGATIVE", 0.2)],
            )),
            emotion: Arc::new(CountingClassifier {
                calls: self.calls.clone(),
                fail: self.fail_inference,
            }),
        })
    }

    fn provider_name(&self) -> &'static str {
        "counting"
    }
}

#[tokio::test]
async fn feedback_correction_takes_precedence() {
    let engine = engine_with(Arc::new(DisabledLoader)).await;

    let predicted = engine.analyze("foo").await;
    assert_ne!(predicted.dominant_emotion, Emotion::Joy);

    engine
        .record_feedback("cust-1", predicted, Some(Emotion::Joy), None, Some("foo".into()))
        .await;

    let out = engine.analyze_traced("foo").await;
    assert_eq!(out.source, AnalysisSource::Feedback);
    assert_eq!(out.result.dominant_emotion, Emotion::Joy);
    assert_eq!(out.result.emotions[0].emotion, Emotion::Joy);
    assert_eq!(out.result.confidence_score, VERIFIED_CONFIDENCE);
}

#[tokio::test]
async fn repeated_text_hits_cache_without_recomputing() {
    let loader = CountingLoader::new(false, false);
    let calls = loader.calls.clone();
    let engine = engine_with(Arc::new(loader)).await;

    let first = engine.analyze_traced("The package arrived").await;
    let second = engine.analyze_traced("The package arrived").await;

    assert_eq!(first.source, AnalysisSource::Model);
    assert_eq!(second.source, AnalysisSource::Cache);
    assert_eq!(first.result, second.result);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_input_returns_fixed_default() {
    let loader = CountingLoader::new(false, false);
    let loads = loader.loads.clone();
    let engine = engine_with(Arc::new(loader)).await;

    for text in ["", "   "] {
        let out = engine.analyze_traced(text).await;
        assert_eq!(out.source, AnalysisSource::Empty);
        let r = out.result;
        assert_eq!(r.sentiment, SentimentLabel::Neutral);
        assert_eq!(r.sentiment_score, 0.5);
        assert_eq!(r.dominant_emotion, Emotion::Neutral);
        assert_eq!(r.language, "en");
        assert_eq!(r.confidence_score, 0.5);
    }
    assert_eq!(loads.load(Ordering::SeqCst), 0);
    assert!(engine.cache().is_empty());
}

#[tokio::test]
async fn frustrated_complaint_is_high_priority() {
    let engine = engine_with(Arc::new(DisabledLoader)).await;

    let out = engine.analyze_traced(COMPLAINT).await;
    assert_eq!(out.source, AnalysisSource::Rules);
    assert_eq!(out.result.sentiment, SentimentLabel::Negative);
    assert_eq!(out.result.dominant_emotion, Emotion::Frustration);

    let scorer = PriorityScorer::default();
    let score = scorer.score(out.result.sentiment_score, out.result.dominant_emotion, 3);
    assert_eq!(scorer.categorize(score), PriorityCategory::High);
}

#[tokio::test]
async fn inference_failure_falls_back_each_call_without_reloading() {
    let loader = CountingLoader::new(true, false);
    let calls = loader.calls.clone();
    let loads = loader.loads.clone();
    let engine = engine_with(Arc::new(loader)).await;

    let a = engine.analyze_traced(COMPLAINT).await;
    let b = engine.analyze_traced("Great support, thank you").await;

    assert_eq!(a.source, AnalysisSource::Rules);
    assert_eq!(b.source, AnalysisSource::Rules);
    assert_eq!(loads.load(Ordering::SeqCst), 1, "models load once");
    assert_eq!(calls.load(Ordering::SeqCst), 2, "inference is retried per text");
    assert!(!engine.analyzer().model().has_failed());
}

#[tokio::test]
async fn load_failure_is_permanent() {
    let loader = CountingLoader::new(false, true);
    let loads = loader.loads.clone();
    let engine = engine_with(Arc::new(loader)).await;

    for text in ["one", "two", "three"] {
        let out = engine.analyze_traced(text).await;
        assert!(out.source.used_fallback());
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(engine.analyzer().model().has_failed());
}

#[tokio::test]
async fn every_result_keeps_dominant_emotion_at_head() {
    let engine = engine_with(Arc::new(DisabledLoader)).await;
    let texts = [
        COMPLAINT,
        "I trust your team, great work",
        "I'm worried and scared about the charge",
        "wow, what an unexpected surprise",
        "ok",
    ];
    for t in texts {
        let r: AnalysisResult = engine.analyze(t).await;
        assert_eq!(r.dominant_emotion, r.emotions[0].emotion, "text: {t}");
        assert!(
            r.emotions.windows(2).all(|w| w[0].score >= w[1].score),
            "emotions not sorted for: {t}"
        );
        assert!((0.0..=1.0).contains(&r.sentiment_score));
    }
}

#[test]
fn language_heuristic_samples() {
    assert_eq!(language::detect("¿Cómo estás?"), "es");
    assert_eq!(language::detect("मुझे मदद चाहिए"), "hi");
    assert_eq!(language::detect("Hello there"), "en");
    assert_eq!(language::detect("Hej där"), "en");
}
