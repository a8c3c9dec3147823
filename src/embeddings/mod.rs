//! Query embedding generation
//!
//! Chunks are embedded at ingestion time by the document pipeline; this
//! module only embeds query text so the vector store can be searched:
//! - Ollama (`nomic-embed-text:latest` by default)
//! - Azure OpenAI (`text-embedding-ada-002` deployments)

pub mod client;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
