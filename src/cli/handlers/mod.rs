//! CLI command handlers module
//!
//! This module is organized by functional domains:
//! - ask: RAG answers, materialized or streamed
//! - documents: Semantic search and source listing
//! - serve: API server
//! - info: Configuration display

pub mod ask;
pub mod documents;
pub mod info;
pub mod serve;

// Re-export all public handlers
pub use ask::*;
pub use documents::*;
pub use info::*;
pub use serve::*;
