pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::cache::handlers as cache_handlers;
use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/keywords/analyze",
            post(handlers::handle_analyze_keywords),
        )
        .route(
            "/api/v1/aso/keyword-field",
            post(handlers::handle_keyword_field),
        )
        .route("/api/v1/aso/title", post(handlers::handle_title))
        .route("/api/v1/aso/subtitle", post(handlers::handle_subtitle))
        .route("/api/v1/aso/description", post(handlers::handle_description))
        .route("/api/v1/aso/whats-new", post(handlers::handle_whats_new))
        .route("/api/v1/aso/generate", post(handlers::handle_generate_all))
        // Cache administration
        .route("/api/v1/cache/stats", get(cache_handlers::handle_cache_stats))
        .route("/api/v1/cache", delete(cache_handlers::handle_invalidate))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::cache::ResultCache;
    use crate::config::Config;
    use crate::generation::GenerationOrchestrator;
    use crate::keywords::{KeywordScorer, ScoringWeights};
    use crate::llm_client::testing::ScriptedProvider;
    use crate::llm_client::{RetryPolicy, TextCompletionProvider};
    use crate::load_guard::testing::FixedProbe;
    use crate::load_guard::{LoadGuard, LoadThresholds};

    fn test_config() -> Config {
        Config {
            gemini_api_key: "test".to_string(),
            gemini_model: "test-model".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            retry: RetryPolicy::default(),
            scoring_weights: ScoringWeights::default(),
            cache_ttl: Duration::from_secs(60),
            cache_capacity: 10,
            load_thresholds: LoadThresholds::default(),
        }
    }

    fn app(provider: Arc<dyn TextCompletionProvider>, probe: Arc<FixedProbe>) -> Router {
        let config = test_config();
        let cache = Arc::new(ResultCache::new(config.cache_capacity, config.cache_ttl));
        let guard = LoadGuard::new(probe, config.load_thresholds).with_reclaimer(cache.clone());
        let orchestrator = GenerationOrchestrator::new(
            provider,
            KeywordScorer::default(),
            cache,
            guard,
            config.retry,
        );
        build_router(AppState {
            orchestrator: Arc::new(orchestrator),
            config,
        })
    }

    async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn keywords() -> Value {
        json!([
            { "keyword": "fitness", "ranking": 1, "popularity": 100.0, "difficulty": 0.0 },
            { "keyword": "workout", "ranking": 12, "popularity": 70.0, "difficulty": 40.0 }
        ])
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(Arc::new(ScriptedProvider::always("x")), FixedProbe::idle());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["cache"]["entries"], 0);
    }

    #[tokio::test]
    async fn test_analyze_keywords() {
        let app = app(Arc::new(ScriptedProvider::always("x")), FixedProbe::idle());
        let (status, body) = post(app, "/api/v1/keywords/analyze", json!({ "keywords": keywords() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["primary_keyword"], "fitness");
        assert_eq!(body["primary_score"], 1.0);
        assert_eq!(body["total_keywords_analyzed"], 2);
    }

    #[tokio::test]
    async fn test_duplicate_keywords_are_bad_request() {
        let app = app(Arc::new(ScriptedProvider::always("x")), FixedProbe::idle());
        let records = json!([
            { "keyword": "Fitness", "ranking": 1, "popularity": 100.0, "difficulty": 0.0 },
            { "keyword": "fitness", "ranking": 2, "popularity": 90.0, "difficulty": 0.0 }
        ]);
        let (status, body) = post(app, "/api/v1/keywords/analyze", json!({ "keywords": records })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_title_endpoint() {
        let app = app(Arc::new(ScriptedProvider::always("x")), FixedProbe::idle());
        let (status, body) = post(
            app,
            "/api/v1/aso/title",
            json!({ "app_name": "Pulse", "primary_keyword": "fitness", "language": "en" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["field"], "title");
        assert_eq!(body["text"], "Fitness - Pulse");
        assert_eq!(body["cached"], false);
    }

    #[tokio::test]
    async fn test_overloaded_is_service_unavailable() {
        let app = app(Arc::new(ScriptedProvider::always("x")), FixedProbe::busy());
        let (status, body) = post(
            app,
            "/api/v1/aso/subtitle",
            json!({ "app_name": "Pulse", "primary_keyword": "fitness", "language": "en" }),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "OVERLOADED");
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_failure_lists_fields() {
        let provider = Arc::new(ScriptedProvider::failing(|| {
            crate::llm_client::ProviderError::Api {
                status: 500,
                message: "boom".to_string(),
            }
        }));
        let app = app(provider, FixedProbe::idle());
        let (status, body) = post(
            app,
            "/api/v1/aso/generate",
            json!({ "app_name": "Pulse", "keywords": keywords(), "language": "en" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "GENERATION_FAILED");
        let details = body["error"]["details"].as_array().unwrap();
        let fields: Vec<&str> = details.iter().filter_map(|d| d["field"].as_str()).collect();
        assert_eq!(fields, ["subtitle", "description", "whats_new"]);
    }

    #[tokio::test]
    async fn test_cache_invalidation_by_pattern() {
        let app = app(Arc::new(ScriptedProvider::always("x")), FixedProbe::idle());
        let title = json!({ "app_name": "Pulse", "primary_keyword": "fitness", "language": "en" });
        post(app.clone(), "/api/v1/aso/title", title.clone()).await;

        let (_, cached) = post(app.clone(), "/api/v1/aso/title", title.clone()).await;
        assert_eq!(cached["cached"], true);

        let response = app
            .clone()
            .oneshot(
                Request::delete("/api/v1/cache?pattern=title:")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["removed"], 1);
        assert_eq!(body["stats"]["entries"], 0);

        let (_, fresh) = post(app, "/api/v1/aso/title", title).await;
        assert_eq!(fresh["cached"], false);
    }

    #[tokio::test]
    async fn test_empty_keyword_set_is_selection_error() {
        let app = app(Arc::new(ScriptedProvider::always("x")), FixedProbe::idle());
        let (status, body) = post(
            app,
            "/api/v1/aso/generate",
            json!({ "app_name": "Pulse", "keywords": [], "language": "ja" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "SELECTION_ERROR");
    }
}
