//! RAG (Retrieval-Augmented Generation) module
//!
//! This module answers free-text queries over a user's uploaded documents:
//! - Per-user semantic retrieval with an `"about"` fallback for empty results
//! - Optional cross-encoder re-ranking of the retrieved passages
//! - Intent classification that picks a response template
//! - Template-driven generation, materialized or streamed
//!
//! # Examples
//!
//! ```rust,no_run
//! use nexqa::config::AppConfig;
//! use nexqa::rag::RagRequest;
//! use nexqa::rag::RagService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = RagService::from_config(&config)?;
//!
//!     let request = RagRequest::new("What are the login requirements?", "alice");
//!     let result = service.run(&request).await?;
//!     println!("[{}] {}", result.action, result.response);
//!     println!("Sources: {} passages", result.sources.len());
//!
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod context;
pub mod pipeline;
pub mod prompts;
pub mod reranker;
pub mod templates;

pub use classifier::Classification;
pub use classifier::FallbackReason;
pub use classifier::IntentClassifier;
pub use classifier::LlmActionClassifier;
pub use context::ContextAssembler;
pub use pipeline::RagRequest;
pub use pipeline::RagResult;
pub use pipeline::RagService;
pub use pipeline::StreamEvent;
pub use pipeline::StreamMeta;
pub use pipeline::StreamSession;
pub use reranker::CrossEncoderReranker;
pub use reranker::DisabledReranker;
pub use reranker::RerankOutcome;
pub use reranker::Reranker;
pub use templates::ActionTemplate;
pub use templates::ActionType;
pub use templates::MatchTier;
pub use templates::TemplateRegistry;
