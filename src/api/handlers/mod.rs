/// API request handlers
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::api::types::HealthResponse;
use crate::api::types::InfoResponse;
use crate::config::AppConfig;
use crate::rag::RagService;

pub mod documents;
pub mod rag;

pub use documents::*;
pub use rag::*;

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub rag: RagService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(rag: RagService, config: AppConfig) -> Self {
        Self {
            rag,
            config: Arc::new(config),
        }
    }

    /// User id from the request headers, else the configured default
    pub fn user_id(&self, headers: &HeaderMap) -> String {
        headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map_or_else(
                || self.config.server.default_user_id.clone(),
                ToString::to_string,
            )
    }
}

/// Health check handler
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Service and model information
pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "NexQA".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: state.config.generation_mode().to_string(),
        available_models: state.config.llm.available_models.clone(),
        active_model: state.rag.model_name().to_string(),
    })
}
