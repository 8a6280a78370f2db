use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::generation::models::FieldName;
use crate::keywords::SelectionError;
use crate::llm_client::ProviderError;
use crate::load_guard::OverloadError;
use crate::synthesis::SynthesisError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Keyword selection failed: {0}")]
    Selection(#[from] SelectionError),

    #[error("Text synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Completion provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    Overload(#[from] OverloadError),

    #[error("Generation failed for {}", summarize(.0))]
    Aggregate(Vec<FieldFailure>),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// One failed field of a multi-field request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFailure {
    pub field: FieldName,
    pub code: &'static str,
    pub message: String,
}

impl FieldFailure {
    pub fn new(field: FieldName, error: &AppError) -> Self {
        Self {
            field,
            code: error.code(),
            message: error.public_message(),
        }
    }
}

fn summarize(failures: &[FieldFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

const PROVIDER_MESSAGE: &str = "The text generation service failed to respond";
const INTERNAL_MESSAGE: &str = "An internal server error occurred";

impl AppError {
    /// Message safe to send to clients. Upstream and internal details only go to the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Provider(_) => PROVIDER_MESSAGE.to_string(),
            AppError::Internal(_) => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Selection(_) => "SELECTION_ERROR",
            AppError::Synthesis(_) => "SYNTHESIS_ERROR",
            AppError::Provider(_) => "PROVIDER_ERROR",
            AppError::Overload(_) => "OVERLOADED",
            AppError::Aggregate(_) => "GENERATION_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Selection(_) => StatusCode::BAD_REQUEST,
            AppError::Synthesis(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Provider(_) | AppError::Aggregate(_) => StatusCode::BAD_GATEWAY,
            AppError::Overload(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        match &self {
            AppError::Provider(e) => tracing::error!("Provider error: {e}"),
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
            _ => {}
        }
        let message = self.public_message();

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let AppError::Aggregate(failures) = &self {
            error["details"] = json!(failures);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
