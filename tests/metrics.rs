// tests/metrics.rs
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use customer_priority_engine::analyze::model::DisabledLoader;
use customer_priority_engine::metrics::Metrics;
use customer_priority_engine::store::MemoryStorage;
use customer_priority_engine::{api, Engine, EngineConfig};

// Build full in-process app with metrics installed first so nothing is dropped.
async fn build_app() -> Router {
    let metrics = Metrics::init().expect("install recorder");
    let engine = Engine::with_parts(
        EngineConfig::default(),
        Arc::new(MemoryStorage::new()),
        Arc::new(DisabledLoader),
    )
    .await;
    api::router(Arc::new(engine)).merge(metrics.router())
}

async fn post_json(app: &Router, uri: &str, payload: serde_json::Value) -> StatusCode {
    let req = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    app.clone().oneshot(req).await.unwrap().status()
}

#[tokio::test]
async fn metrics_endpoint_contains_expected_series() {
    let app = build_app().await;

    let text = "terrible delay again";
    assert!(post_json(&app, "/analyze", json!({ "text": text })).await.is_success());
    assert!(post_json(&app, "/analyze", json!({ "text": text })).await.is_success());

    let prediction = serde_json::to_value(
        customer_priority_engine::AnalysisResult::neutral_default(),
    )
    .unwrap();
    assert_eq!(
        post_json(
            &app,
            "/feedback",
            json!({ "customer_id": "c", "original_prediction": prediction }),
        )
        .await,
        StatusCode::CREATED
    );

    let resp = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap(); // 1 MiB
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "analysis_requests_total",
        "source=\"rules\"",
        "source=\"cache\"",
        "model_failures_total",
        "feedback_recorded_total",
        "analysis_duration_ms",
        "analysis_cache_entries",
    ] {
        assert!(
            text.contains(needle),
            "metrics output missing '{needle}':\n{text}"
        );
    }
}

#[tokio::test]
async fn init_twice_reuses_recorder() {
    let a = Metrics::init().expect("first init");
    let b = Metrics::init().expect("second init");
    // Both handles render from the same registry.
    metrics::counter!("init_twice_probe_total").increment(1);
    assert!(a.handle.render().contains("init_twice_probe_total"));
    assert!(b.handle.render().contains("init_twice_probe_total"));
}
