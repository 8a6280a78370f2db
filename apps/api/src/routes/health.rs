use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Service version, configured model, cache counters and the current host load.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let guard = state.orchestrator.guard();
    let load = guard.snapshot();

    Json(json!({
        "status": if guard.is_overloaded() { "degraded" } else { "ok" },
        "version": env!("CARGO_PKG_VERSION"),
        "service": "aso-api",
        "model": state.config.gemini_model,
        "cache": state.orchestrator.cache().stats(),
        "load": {
            "cpu": load.cpu_fraction,
            "memory": load.memory_fraction,
        },
    }))
}
