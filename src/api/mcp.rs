//! MCP (Model Context Protocol) tool endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use super::handlers::AppState;
use crate::errors::NexqaError;
use crate::errors::Result;
use crate::rag::RagRequest;

/// MCP protocol version
const MCP_VERSION: &str = "1.0";

/// MCP server information
#[derive(Debug, Serialize, Deserialize)]
pub struct McpServerInfo {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
    pub capabilities: McpCapabilities,
}

/// MCP capabilities
#[derive(Debug, Serialize, Deserialize)]
pub struct McpCapabilities {
    pub resources: bool,
    pub tools: bool,
    pub prompts: bool,
}

/// MCP tool definition
#[derive(Debug, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// MCP tool call request
#[derive(Debug, Deserialize)]
pub struct McpToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// MCP tool call response
#[derive(Debug, Serialize, Deserialize)]
pub struct McpToolCallResponse {
    pub content: Vec<McpContent>,
    pub is_error: bool,
}

impl McpToolCallResponse {
    fn text(text: String, is_error: bool) -> Self {
        Self {
            content: vec![McpContent {
                r#type: "text".to_string(),
                text,
            }],
            is_error,
        }
    }
}

/// MCP content
#[derive(Debug, Serialize, Deserialize)]
pub struct McpContent {
    pub r#type: String,
    pub text: String,
}

/// Get MCP server information
async fn get_server_info(State(state): State<AppState>) -> Json<McpServerInfo> {
    Json(McpServerInfo {
        name: state.config.mcp.server_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol_version: MCP_VERSION.to_string(),
        capabilities: McpCapabilities {
            resources: false,
            tools: true,
            prompts: false,
        },
    })
}

/// List available tools
async fn list_tools() -> Json<Vec<McpTool>> {
    Json(vec![
        McpTool {
            name: "list_documents".to_string(),
            description: "List all ingested documents for a user".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "user_id": {
                        "type": "string",
                        "description": "Owner of the documents"
                    }
                }
            }),
        },
        McpTool {
            name: "search_documents".to_string(),
            description: "Semantic search over the user's documents".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "user_id": {
                        "type": "string",
                        "description": "Owner of the documents"
                    },
                    "top_k": {
                        "type": "integer",
                        "description": "Maximum number of passages",
                        "default": 5
                    }
                },
                "required": ["query"]
            }),
        },
        McpTool {
            name: "rag_query".to_string(),
            description: "Answer a question from the user's documents with the RAG pipeline"
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Question or instruction"
                    },
                    "user_id": {
                        "type": "string",
                        "description": "Owner of the documents"
                    },
                    "top_k": {
                        "type": "integer",
                        "description": "Number of passages to retrieve",
                        "default": 5
                    },
                    "use_reranking": {
                        "type": "boolean",
                        "description": "Re-rank passages with the cross-encoder",
                        "default": true
                    },
                    "force_type": {
                        "type": "string",
                        "description": "Response type to use instead of classifying",
                        "enum": ["ask", "summary", "testcase_excel", "validate", "test_strategy", "risk"]
                    }
                },
                "required": ["query"]
            }),
        },
    ])
}

#[derive(Debug, Deserialize)]
struct ListDocumentsArgs {
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchDocumentsArgs {
    query: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RagQueryArgs {
    query: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    use_reranking: Option<bool>,
    #[serde(default)]
    force_type: Option<String>,
}

fn parse_args<T: for<'de> Deserialize<'de>>(arguments: serde_json::Value) -> Result<T> {
    let arguments = if arguments.is_null() {
        serde_json::json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| NexqaError::InvalidRequest(e.to_string()))
}

impl AppState {
    fn mcp_user(&self, user_id: Option<String>) -> String {
        user_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.config.mcp.default_user_id.clone())
    }
}

async fn run_tool(state: &AppState, name: &str, arguments: serde_json::Value) -> Result<String> {
    let value = match name {
        "list_documents" => {
            let args: ListDocumentsArgs = parse_args(arguments)?;
            let user_id = state.mcp_user(args.user_id);
            let documents = state.rag.store().list_sources(&user_id).await?;
            serde_json::json!({ "documents": documents, "user_id": user_id })
        }
        "search_documents" => {
            let args: SearchDocumentsArgs = parse_args(arguments)?;
            let user_id = state.mcp_user(args.user_id);
            let top_k = args.top_k.unwrap_or(state.config.rag.default_top_k);
            let results = state.rag.search(&args.query, &user_id, top_k).await?;
            serde_json::json!({
                "count": results.len(),
                "results": results,
                "query": args.query,
            })
        }
        "rag_query" => {
            let args: RagQueryArgs = parse_args(arguments)?;
            let mut request = RagRequest::new(args.query, state.mcp_user(args.user_id))
                .with_top_k(args.top_k.unwrap_or(state.config.rag.default_top_k))
                .with_reranking(args.use_reranking.unwrap_or(true));
            request.forced_type = args.force_type;
            serde_json::to_value(state.rag.run(&request).await?)?
        }
        other => return Err(NexqaError::InvalidRequest(format!("unknown tool '{other}'"))),
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Call a tool
async fn call_tool(
    State(state): State<AppState>,
    Json(req): Json<McpToolCallRequest>,
) -> std::result::Result<Json<McpToolCallResponse>, StatusCode> {
    info!("MCP tool call: {}", req.name);

    if !matches!(req.name.as_str(), "list_documents" | "search_documents" | "rag_query") {
        return Err(StatusCode::NOT_FOUND);
    }

    match run_tool(&state, &req.name, req.arguments).await {
        Ok(text) => Ok(Json(McpToolCallResponse::text(text, false))),
        Err(e) => {
            warn!("MCP tool {} failed: {}", req.name, e);
            Ok(Json(McpToolCallResponse::text(format!("Error: {e}"), true)))
        }
    }
}

/// Create MCP router
pub fn mcp_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_server_info))
        .route("/tools", get(list_tools))
        .route("/tools/call", post(call_tool))
        .with_state(state)
}
