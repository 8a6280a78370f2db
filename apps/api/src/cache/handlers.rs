//! Cache administration.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InvalidateQuery {
    /// Substring of `operation:digest`, e.g. `subtitle:`. Absent clears everything.
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub removed: usize,
    pub stats: CacheStats,
}

/// GET /api/v1/cache/stats
pub async fn handle_cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.orchestrator.cache().stats())
}

/// DELETE /api/v1/cache
pub async fn handle_invalidate(
    State(state): State<AppState>,
    Query(query): Query<InvalidateQuery>,
) -> Result<Json<InvalidateResponse>, AppError> {
    let cache = state.orchestrator.cache();

    let removed = match query.pattern.as_deref().map(str::trim) {
        Some("") => {
            return Err(AppError::Validation("pattern cannot be blank".to_string()));
        }
        Some(pattern) => cache.invalidate_matching(pattern),
        None => cache.clear(),
    };

    tracing::info!(removed, pattern = ?query.pattern, "Cache invalidated");

    Ok(Json(InvalidateResponse {
        removed,
        stats: cache.stats(),
    }))
}
