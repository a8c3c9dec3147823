/// Document listing and search handlers
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::error;
use tracing::info;

use super::AppState;
use crate::api::types::require_query;
use crate::api::types::ApiError;
use crate::api::types::DocumentListResponse;
use crate::api::types::SearchRequest;
use crate::api::types::SearchResponse;

/// List ingested documents (GET /api/documents/list)
pub async fn list_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let user_id = state.user_id(&headers);
    info!("GET /api/documents/list for {}", user_id);

    match state.rag.store().list_sources(&user_id).await {
        Ok(documents) => Ok(Json(DocumentListResponse {
            count: documents.len(),
            documents,
            user_id,
        })),
        Err(e) => {
            error!("Failed to list documents for {}: {}", user_id, e);
            let query = e.query().unwrap_or(&user_id).to_string();
            Err(ApiError::from_pipeline(&e, &query))
        }
    }
}

/// Semantic search without generation (POST /api/query/search)
pub async fn search_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = require_query(req.query)?;
    let user_id = state.user_id(&headers);
    info!("POST /api/query/search for {}: {}", user_id, query);

    let top_k = req.top_k.unwrap_or(state.config.rag.default_top_k);
    match state.rag.search(&query, &user_id, top_k).await {
        Ok(results) => Ok(Json(SearchResponse {
            count: results.len(),
            results,
            query,
        })),
        Err(e) => {
            error!("Search failed: {}", e);
            Err(ApiError::from_pipeline(&e, &query))
        }
    }
}
