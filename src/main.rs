//! Customer Priority Engine: Binary Entrypoint
//! Boots the Axum HTTP server: config, engine, API routes and `/metrics`.

use std::sync::Arc;

use customer_priority_engine::{api, config::EngineConfig, metrics::Metrics, Engine};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("customer_priority_engine=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    // Shuttle may already have installed a global subscriber.
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = EngineConfig::load_default()?;
    tracing::info!(
        tenant = %config.tenant,
        backend = ?config.storage.backend,
        model_enabled = config.model.enabled,
        provider = %config.model.provider,
        "configuration loaded"
    );

    let engine = Arc::new(Engine::from_config(config).await?);
    engine.probe_model().await;

    let metrics = Metrics::init()?;
    let router = api::router(engine).merge(metrics.router());

    Ok(router.into())
}
