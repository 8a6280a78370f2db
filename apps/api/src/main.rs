mod cache;
mod config;
mod errors;
mod generation;
mod keywords;
mod llm_client;
mod load_guard;
mod routes;
mod state;
mod synthesis;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cache::ResultCache;
use crate::config::Config;
use crate::generation::GenerationOrchestrator;
use crate::keywords::KeywordScorer;
use crate::llm_client::LlmClient;
use crate::load_guard::{LoadGuard, SysinfoProbe};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing or malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ASO API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize completion provider
    let llm = LlmClient::new(config.gemini_api_key.clone(), config.gemini_model.clone())?;
    info!("LLM client initialized (model: {})", llm.model());

    let scorer = KeywordScorer::new(config.scoring_weights)?;

    let cache = Arc::new(ResultCache::new(config.cache_capacity, config.cache_ttl));
    info!(
        capacity = config.cache_capacity,
        ttl_secs = config.cache_ttl.as_secs(),
        "Result cache initialized"
    );

    // Expired cache entries are purged after every scoped generation
    let guard = LoadGuard::new(Arc::new(SysinfoProbe::new()), config.load_thresholds)
        .with_reclaimer(cache.clone());

    let orchestrator = GenerationOrchestrator::new(Arc::new(llm), scorer, cache, guard, config.retry);

    // Build app state
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the dashboard domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
