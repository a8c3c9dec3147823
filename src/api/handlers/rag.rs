/// RAG-related API handlers
use std::convert::Infallible;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use axum::response::sse::Sse;
use axum::Json;
use futures::Stream;
use futures::StreamExt;
use serde_json::json;
use tracing::error;
use tracing::info;

use super::AppState;
use crate::api::types::ApiError;
use crate::api::types::RagQueryRequest;
use crate::rag::RagResult;
use crate::rag::StreamEvent;

/// RAG query (POST /api/query/rag)
pub async fn rag_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RagQueryRequest>,
) -> Result<Json<RagResult>, ApiError> {
    let request =
        req.into_rag_request(state.user_id(&headers), state.config.rag.default_top_k)?;
    info!("POST /api/query/rag for {}: {}", request.user_id, request.query);

    match state.rag.run(&request).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            error!("Error processing RAG query: {}", e);
            Err(ApiError::from_pipeline(&e, &request.query))
        }
    }
}

/// Streaming RAG query (POST /api/query/rag/stream) as server-sent events
///
/// Emits one `meta` event, `token` events as text arrives, then `done`.
/// A failure after the stream has started is sent as an `error` event.
pub async fn rag_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RagQueryRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let request =
        req.into_rag_request(state.user_id(&headers), state.config.rag.default_top_k)?;
    info!("POST /api/query/rag/stream for {}: {}", request.user_id, request.query);

    let session = state.rag.stream(&request).await.map_err(|e| {
        error!("Error starting RAG stream: {}", e);
        ApiError::from_pipeline(&e, &request.query)
    })?;

    let query = request.query;
    let events = session.into_event_stream().map(move |event| {
        Ok(match event {
            Ok(event) => sse_event(&event),
            Err(e) => {
                error!("RAG stream failed: {}", e);
                Event::default().event("error").data(
                    json!({ "error": e.to_string(), "query": query, "type": e.action() })
                        .to_string(),
                )
            }
        })
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn sse_event(event: &StreamEvent) -> Event {
    let payload = match event {
        StreamEvent::Meta(meta) => json!(meta),
        StreamEvent::Token(token) => json!({ "token": token }),
        StreamEvent::Done { response, action } => json!({ "response": response, "type": action }),
    };
    Event::default().event(event.name()).data(payload.to_string())
}
