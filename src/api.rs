// src/api.rs
//! HTTP surface consumed by the CRM front end.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::analyze::scoring::{score_with_max, PriorityCategory};
use crate::analyze::types::{AnalysisResult, Emotion, SentimentLabel};
use crate::customers::{CustomerAnalysisData, CustomerMessage};
use crate::engine::Engine;
use crate::feedback::FeedbackEntry;
use crate::report::Report;
use crate::sentiment::{quick_sentiment, QuickSentiment};

/// Response header naming the pipeline stage that produced an analysis.
pub const ANALYSIS_SOURCE_HEADER: &str = "x-analysis-source";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

pub fn router(engine: Arc<Engine>) -> Router {
    let state = AppState { engine };

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/analyze", post(analyze))
        .route("/feedback", post(record_feedback).get(list_feedback))
        .route("/priority", post(priority))
        .route("/messages", post(add_message))
        .route("/customers/priority", get(customer_priorities))
        .route("/report", get(report))
        .route("/sentiment/quick", post(quick))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

type ApiError = (StatusCode, String);

fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, msg.into())
}

#[derive(Deserialize)]
struct TextReq {
    text: String,
}

async fn analyze(State(state): State<AppState>, Json(body): Json<TextReq>) -> impl IntoResponse {
    let out = state.engine.analyze_traced(&body.text).await;
    (
        [(ANALYSIS_SOURCE_HEADER, out.source.as_str())],
        Json(out.result),
    )
}

#[derive(Deserialize)]
struct FeedbackReq {
    #[serde(alias = "customerId")]
    customer_id: String,
    #[serde(alias = "originalPrediction")]
    original_prediction: AnalysisResult,
    #[serde(default, alias = "correctedEmotion")]
    corrected_emotion: Option<Emotion>,
    #[serde(default, alias = "correctedSentiment")]
    corrected_sentiment: Option<SentimentLabel>,
    #[serde(default, alias = "originalText")]
    original_text: Option<String>,
}

async fn record_feedback(
    State(state): State<AppState>,
    Json(body): Json<FeedbackReq>,
) -> Result<(StatusCode, Json<FeedbackEntry>), ApiError> {
    if body.customer_id.trim().is_empty() {
        return Err(bad_request("customer_id must not be empty"));
    }
    let entry = state
        .engine
        .record_feedback(
            body.customer_id.trim(),
            body.original_prediction,
            body.corrected_emotion,
            body.corrected_sentiment,
            body.original_text,
        )
        .await;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn list_feedback(State(state): State<AppState>) -> Json<Vec<FeedbackEntry>> {
    Json(state.engine.all_feedback())
}

#[derive(Deserialize)]
struct PriorityReq {
    #[serde(alias = "sentimentScore")]
    sentiment_score: f32,
    #[serde(alias = "dominantEmotion")]
    dominant_emotion: Emotion,
    #[serde(alias = "interactionCount")]
    interaction_count: u32,
    #[serde(default, alias = "maxInteractions")]
    max_interactions: Option<u32>,
}

#[derive(Serialize)]
struct PriorityResp {
    score: f32,
    category: PriorityCategory,
}

async fn priority(State(state): State<AppState>, Json(body): Json<PriorityReq>) -> Json<PriorityResp> {
    let scorer = state.engine.scorer();
    let score = match body.max_interactions {
        Some(max) if max > 0 => score_with_max(
            body.sentiment_score,
            body.dominant_emotion,
            body.interaction_count,
            max,
        ),
        _ => scorer.score(
            body.sentiment_score,
            body.dominant_emotion,
            body.interaction_count,
        ),
    };
    Json(PriorityResp {
        score,
        category: scorer.categorize(score),
    })
}

#[derive(Deserialize)]
struct MessageReq {
    #[serde(alias = "customerId")]
    customer_id: String,
    #[serde(default, alias = "customerName")]
    customer_name: String,
    text: String,
}

async fn add_message(
    State(state): State<AppState>,
    Json(body): Json<MessageReq>,
) -> Result<(StatusCode, Json<CustomerMessage>), ApiError> {
    if body.customer_id.trim().is_empty() {
        return Err(bad_request("customer_id must not be empty"));
    }
    if body.text.trim().is_empty() {
        return Err(bad_request("text must not be empty"));
    }
    let msg = state
        .engine
        .add_message(&body.customer_id, &body.customer_name, &body.text)
        .await;
    Ok((StatusCode::CREATED, Json(msg)))
}

#[derive(Deserialize)]
struct PriorityFilter {
    #[serde(default)]
    category: Option<String>,
}

async fn customer_priorities(
    State(state): State<AppState>,
    Query(q): Query<PriorityFilter>,
) -> Result<Json<Vec<CustomerAnalysisData>>, ApiError> {
    let filter = match q.category.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(raw.parse::<PriorityCategory>().map_err(bad_request)?),
    };
    Ok(Json(state.engine.customer_priorities(filter).await))
}

async fn report(State(state): State<AppState>) -> Json<Report> {
    Json(state.engine.report().await)
}

async fn quick(Json(body): Json<TextReq>) -> Json<QuickSentiment> {
    Json(quick_sentiment(&body.text))
}
