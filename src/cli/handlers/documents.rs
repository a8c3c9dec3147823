//! Search and source listing handlers

use crate::cli::output::*;
use crate::rag::RagService;
use crate::AppConfig;
use crate::Result;

fn resolve_user(config: &AppConfig, user: Option<String>) -> String {
    user.unwrap_or_else(|| config.server.default_user_id.clone())
}

pub async fn handle_search(
    config: &AppConfig,
    query: String,
    user: Option<String>,
    top_k: Option<usize>,
) -> Result<()> {
    let user_id = resolve_user(config, user);
    print_info(&format!("🔍 Searching {user_id}'s documents: \"{query}\""));

    let service = RagService::from_config(config)?;
    let top_k = top_k.unwrap_or(config.rag.default_top_k);
    let passages = service.search(&query, &user_id, top_k).await?;

    if passages.is_empty() {
        print_warning("No matching passages found");
        return Ok(());
    }
    print_success(&format!("Found {} passages", passages.len()));
    print_sources(&passages);
    Ok(())
}

pub async fn handle_sources(config: &AppConfig, user: Option<String>) -> Result<()> {
    let user_id = resolve_user(config, user);
    let service = RagService::from_config(config)?;
    let sources = service.store().list_sources(&user_id).await?;

    if sources.is_empty() {
        print_warning(&format!("No documents ingested for {user_id}"));
        return Ok(());
    }
    println!("📄 Documents for {user_id} ({}):", sources.len());
    for source in sources {
        println!("  - {source}");
    }
    Ok(())
}
