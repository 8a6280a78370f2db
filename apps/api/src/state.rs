use std::sync::Arc;

use crate::config::Config;
use crate::generation::GenerationOrchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<GenerationOrchestrator>,
    pub config: Config,
}
