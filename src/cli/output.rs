//! CLI output formatting utilities
//!
//! This module provides consistent output formatting for the `nexqa` CLI

use crate::rag::RagResult;
use crate::vector_store::Passage;
use crate::AppConfig;

/// Safely truncate a string at character boundary (not byte boundary)
///
/// Returns the string with a "..." suffix if truncated, otherwise unchanged
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Hide all but the last four characters of a secret
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}

/// Print retrieved passages
pub fn print_sources(passages: &[Passage]) {
    if passages.is_empty() {
        println!("  (no passages)");
        return;
    }
    for (idx, passage) in passages.iter().enumerate() {
        println!(
            "  {}. [{}] (distance {:.4})",
            idx + 1,
            passage.source().unwrap_or("unknown"),
            passage.distance
        );
        println!("     {}", truncate_str(&passage.content.replace('\n', " "), 160));
    }
}

/// Print a generated answer with its metadata and sources
pub fn print_rag_result(result: &RagResult, show_response: bool) {
    println!();
    println!("📝 Type: {}", result.action);
    if show_response {
        println!();
        println!("{}", result.response);
    }
    println!();
    println!("📚 Sources ({} chunks):", result.context_chunks);
    print_sources(&result.sources);
}

/// Print configuration
pub fn print_config(config: &AppConfig) {
    println!("📋 NexQA Configuration:");
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!("  Backtrace: {}", config.logging.backtrace);
    println!();

    println!("🤖 Generation:");
    println!("  Mode: {}", config.generation_mode());
    println!("  Ollama endpoint: {}", config.llm.ollama_endpoint);
    println!("  Model: {}", config.llm_model());
    println!("  Azure endpoint: {}", config.llm.azure_endpoint.as_deref().unwrap_or("(not set)"));
    println!(
        "  Azure key: {}",
        config.llm.azure_api_key.as_deref().map_or_else(|| "(not set)".to_string(), mask_secret)
    );
    println!("  Azure deployment: {}", config.llm.azure_deployment);
    println!("  Timeout: {}s", config.llm.request_timeout_secs);
    println!();

    println!("🧠 Embeddings:");
    println!("  Provider: {:?}", config.embeddings.provider);
    println!("  Model: {}", config.embedding_model());
    println!();

    println!("🗄️  Vector store:");
    println!("  Endpoint: {}", config.vector_store.endpoint);
    println!("  Collection: {}", config.vector_store.collection);
    println!();

    println!("🔀 Re-ranking:");
    println!("  Enabled: {}", config.reranker.enabled);
    println!("  Endpoint: {}", config.reranker.endpoint.as_deref().unwrap_or("(not set)"));
    println!("  Model: {}", config.reranker.model);
    println!();

    println!("🌐 Server:");
    println!("  Bind: {}", config.bind_address());
    println!("  CORS: {}", config.server.enable_cors);
    println!("  Default user: {}", config.server.default_user_id);
    println!("  MCP default user: {}", config.mcp.default_user_id);
}

/// Print colored output functions
pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("❌ {msg}");
}
