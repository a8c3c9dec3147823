//! API route definitions

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers::AppState;
use super::handlers::{
    self,
};

/// Create RESTful API router
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Service status
        .route("/health", get(handlers::health))
        .route("/info", get(handlers::info))
        // Document endpoints
        .route("/documents/list", get(handlers::list_documents))
        // Query endpoints
        .route("/query/search", post(handlers::search_documents))
        .route("/query/rag", post(handlers::rag_query))
        .route("/query/rag/stream", post(handlers::rag_stream))
        .with_state(state)
}
