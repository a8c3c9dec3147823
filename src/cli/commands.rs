//! CLI command definitions and argument parsing

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(name = "nexqa")]
#[command(about = "NexQA CLI: QA-focused retrieval-augmented answers over your documents")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API and MCP tool server
    Serve {
        /// Host to bind to (default: from config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (default: from config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable permissive CORS (default: from config)
        #[arg(long)]
        cors: bool,
    },
    /// Ask a question against your documents
    Ask {
        /// Question or instruction
        query: String,
        /// User whose documents are searched (default: from config)
        #[arg(short, long)]
        user: Option<String>,
        /// Response type to force (ask, summary, testcase_excel, validate, test_strategy, risk)
        #[arg(short = 't', long = "type")]
        response_type: Option<String>,
        /// Number of passages to retrieve (default: from config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Skip cross-encoder re-ranking
        #[arg(long)]
        no_rerank: bool,
        /// Print the answer as it is generated
        #[arg(short, long)]
        stream: bool,
    },
    /// Semantic search without generation
    Search {
        /// Search query
        query: String,
        /// User whose documents are searched (default: from config)
        #[arg(short, long)]
        user: Option<String>,
        /// Number of passages to return (default: from config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// List ingested document sources
    Sources {
        /// User whose documents are listed (default: from config)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Show current configuration
    Config,
}
