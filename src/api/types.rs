//! API request and response types

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::NexqaError;
use crate::rag::RagRequest;
use crate::vector_store::Passage;

fn default_true() -> bool {
    true
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// Service information
#[derive(Debug, Serialize, Deserialize)]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    pub mode: String,
    pub available_models: Vec<String>,
    pub active_model: String,
}

/// Documents ingested for a user
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<String>,
    pub user_id: String,
    pub count: usize,
}

/// Semantic search request
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    /// Defaults to `rag.default_top_k`
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Semantic search response
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<Passage>,
    pub query: String,
    pub count: usize,
}

/// RAG query request
#[derive(Debug, Deserialize)]
pub struct RagQueryRequest {
    #[serde(default)]
    pub query: Option<String>,
    /// Response type to force instead of classifying
    #[serde(default, rename = "type")]
    pub action: Option<String>,
    /// Defaults to `rag.default_top_k`
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default = "default_true")]
    pub use_reranking: bool,
}

impl RagQueryRequest {
    /// Pipeline request for `user_id`, rejecting a missing or blank query
    pub fn into_rag_request(
        self,
        user_id: String,
        default_top_k: usize,
    ) -> Result<RagRequest, ApiError> {
        let query = require_query(self.query)?;
        let mut request = RagRequest::new(query, user_id)
            .with_top_k(self.top_k.unwrap_or(default_top_k))
            .with_reranking(self.use_reranking);
        request.forced_type = self.action.filter(|t| !t.trim().is_empty());
        Ok(request)
    }
}

pub(crate) fn require_query(query: Option<String>) -> Result<String, ApiError> {
    match query {
        Some(q) if !q.trim().is_empty() => Ok(q),
        _ => Err(ApiError::bad_request("Query not provided")),
    }
}

/// Error body returned by the REST endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Handler failure with its HTTP status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: message.into(),
                query: None,
                action: None,
            },
        }
    }

    /// Map a pipeline failure for `query`: retrieval is a bad gateway, anything else is internal
    pub fn from_pipeline(err: &NexqaError, query: &str) -> Self {
        let status = match err {
            NexqaError::Retrieval { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            body: ErrorResponse {
                error: err.to_string(),
                query: Some(query.to_string()),
                action: err.action().map(ToString::to_string),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_request_defaults() {
        let req: RagQueryRequest = serde_json::from_str(r#"{"query": "hi"}"#).unwrap();
        assert_eq!(req.top_k, None);
        assert!(req.use_reranking);

        let request = req.into_rag_request("u".to_string(), 5).unwrap();
        assert_eq!(request.query, "hi");
        assert_eq!(request.user_id, "u");
        assert_eq!(request.top_k, 5);
        assert_eq!(request.forced_type, None);
    }

    #[test]
    fn test_rag_request_type_field() {
        let req: RagQueryRequest =
            serde_json::from_str(r#"{"query": "hi", "type": "risk", "use_reranking": false}"#)
                .unwrap();
        let request = req.into_rag_request("u".to_string(), 5).unwrap();
        assert_eq!(request.forced_type.as_deref(), Some("risk"));
        assert!(!request.use_reranking);

        let req: RagQueryRequest = serde_json::from_str(r#"{"query": "hi", "type": " "}"#).unwrap();
        assert_eq!(req.into_rag_request("u".to_string(), 5).unwrap().forced_type, None);
    }

    #[test]
    fn test_blank_query_rejected() {
        let req: RagQueryRequest = serde_json::from_str(r#"{"query": "   "}"#).unwrap();
        let err = req.into_rag_request("u".to_string(), 5).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.error, "Query not provided");
    }

    #[test]
    fn test_pipeline_error_mapping() {
        let err = ApiError::from_pipeline(&NexqaError::retrieval("q", "down"), "q");
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.body.action, None);

        let err = ApiError::from_pipeline(
            &NexqaError::generation("model missing").with_action("summary"),
            "q",
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.action.as_deref(), Some("summary"));
        assert_eq!(err.body.query.as_deref(), Some("q"));
    }
}
