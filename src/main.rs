use clap::Parser;
use nexqa::cli::AskOptions;
use nexqa::cli::Cli;
use nexqa::cli::Commands;
use nexqa::config::AppConfig;
use nexqa::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    if cli.verbose {
        nexqa::logging::init_logging_with_level("debug")?;
    } else {
        nexqa::logging::init_logging_with_config(Some(&config))?;
    }
    info!("Configuration loaded successfully");

    // Execute the requested command
    match cli.command {
        Commands::Serve { host, port, cors } => {
            nexqa::cli::handle_serve_api(&config, host, port, cors).await?;
        }
        Commands::Ask {
            query,
            user,
            response_type,
            top_k,
            no_rerank,
            stream,
        } => {
            let options = AskOptions {
                user,
                response_type,
                top_k,
                use_reranking: !no_rerank,
                stream,
            };
            nexqa::cli::handle_ask(&config, query, options).await?;
        }
        Commands::Search { query, user, top_k } => {
            nexqa::cli::handle_search(&config, query, user, top_k).await?;
        }
        Commands::Sources { user } => {
            nexqa::cli::handle_sources(&config, user).await?;
        }
        Commands::Config => {
            nexqa::cli::handle_config_command(&config).await?;
        }
    }

    Ok(())
}
