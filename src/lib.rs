//! NexQA: retrieval-augmented answers for QA engineering
//!
//! A query is answered from the caller's own uploaded documents: passages are
//! retrieved from a vector store, optionally re-ranked, and an intent
//! classifier picks the response template (plain answer, summary, test cases,
//! test case review, test strategy or risk assessment) used for generation.

pub mod api;
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod rag;
pub mod vector_store;


pub use config::AppConfig;
pub use errors::*;
