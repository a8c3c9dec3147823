//! API server handlers

use crate::cli::output::*;
use crate::AppConfig;
use crate::Result;

pub async fn handle_serve_api(
    config: &AppConfig,
    host: Option<String>,
    port: Option<u16>,
    cors: bool,
) -> Result<()> {
    use crate::api::serve_api;

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let cors = cors || config.server.enable_cors;

    println!("🚀 Starting NexQA API Server");
    println!("============================\n");
    println!("📍 Host: {host}");
    println!("🔌 Port: {port}");
    println!("🌐 CORS: {}", if cors { "Enabled" } else { "Disabled" });
    print_info(&format!(
        "Generation: {} ({})",
        config.generation_mode(),
        config.llm_model()
    ));
    if !config.reranking_available() {
        print_warning("Cross-encoder re-ranking not configured, retrieval order is kept");
    }
    println!();

    serve_api(config, host, port, cors).await
}
