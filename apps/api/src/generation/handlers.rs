//! Axum route handlers for the ASO text API.

use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::generation::models::{
    AnalyzeKeywordsRequest, AsoTextBundle, FieldRequest, GenerateAllRequest, GeneratedText,
    KeywordFieldRequest,
};
use crate::keywords::SelectionResult;
use crate::state::AppState;

/// POST /api/v1/keywords/analyze
///
/// Scores and ranks the dataset; returns the primary keyword and candidates.
pub async fn handle_analyze_keywords(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeKeywordsRequest>,
) -> Result<Json<SelectionResult>, AppError> {
    let selection = state.orchestrator.analyze_keywords(request.keywords)?;
    Ok(Json(selection))
}

/// POST /api/v1/aso/keyword-field
pub async fn handle_keyword_field(
    State(state): State<AppState>,
    Json(request): Json<KeywordFieldRequest>,
) -> Result<Json<GeneratedText>, AppError> {
    Ok(Json(state.orchestrator.generate_keyword_field(request).await?))
}

/// POST /api/v1/aso/title
pub async fn handle_title(
    State(state): State<AppState>,
    Json(request): Json<FieldRequest>,
) -> Result<Json<GeneratedText>, AppError> {
    Ok(Json(state.orchestrator.generate_title(request).await?))
}

/// POST /api/v1/aso/subtitle
pub async fn handle_subtitle(
    State(state): State<AppState>,
    Json(request): Json<FieldRequest>,
) -> Result<Json<GeneratedText>, AppError> {
    Ok(Json(state.orchestrator.generate_subtitle(request).await?))
}

/// POST /api/v1/aso/description
pub async fn handle_description(
    State(state): State<AppState>,
    Json(request): Json<FieldRequest>,
) -> Result<Json<GeneratedText>, AppError> {
    Ok(Json(state.orchestrator.generate_description(request).await?))
}

/// POST /api/v1/aso/whats-new
pub async fn handle_whats_new(
    State(state): State<AppState>,
    Json(request): Json<FieldRequest>,
) -> Result<Json<GeneratedText>, AppError> {
    Ok(Json(state.orchestrator.generate_whats_new(request).await?))
}

/// POST /api/v1/aso/generate
///
/// All five fields from one keyword dataset. Either every field is returned
/// or the request fails with the list of failed fields.
pub async fn handle_generate_all(
    State(state): State<AppState>,
    Json(request): Json<GenerateAllRequest>,
) -> Result<Json<AsoTextBundle>, AppError> {
    let bundle = state.orchestrator.generate_all(request).await?;
    Ok(Json(bundle))
}
