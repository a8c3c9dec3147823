//! HTTP server implementation

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::mcp;
use crate::api::routes;
use crate::config::AppConfig;
use crate::rag::RagService;
use crate::Result;

/// Build the full application router: REST under `/api`, tools under `/mcp`
pub fn build_router(state: AppState, enable_cors: bool) -> Router {
    let mut app = Router::new()
        .nest("/api", routes::api_routes(state.clone()))
        .nest("/mcp", mcp::mcp_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        info!("CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Start the API server
///
/// # Errors
/// - Collaborator construction failures (see [`RagService::from_config`])
/// - Bind or serve I/O errors
pub async fn serve_api(config: &AppConfig, host: String, port: u16, enable_cors: bool) -> Result<()> {
    info!("Starting NexQA API server...");

    let rag = RagService::from_config(config)?;
    info!(
        "Generation: {} mode, model {}",
        config.generation_mode(),
        rag.model_name()
    );
    let state = AppState::new(rag, config.clone());
    let app = build_router(state, enable_cors);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /api/health            - Health check");
    info!("  GET  /api/info              - Service and model info");
    info!("  GET  /api/documents/list    - List ingested documents");
    info!("  POST /api/query/search      - Semantic search");
    info!("  POST /api/query/rag         - RAG query");
    info!("  POST /api/query/rag/stream  - Streaming RAG query (SSE)");
    info!("  GET  /mcp/                  - MCP server info");
    info!("  GET  /mcp/tools             - List MCP tools");
    info!("  POST /mcp/tools/call        - Call MCP tool");

    axum::serve(listener, app).await?;

    Ok(())
}
