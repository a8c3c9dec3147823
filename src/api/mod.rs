//! API server module for serving RAG queries via REST and MCP

pub mod handlers;
pub mod mcp;
pub mod routes;
pub mod server;
pub mod types;

pub use server::build_router;
pub use server::serve_api;
