//! Ask command handler

use std::io::Write;
use std::io::{
    self,
};
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::output::*;
use crate::rag::RagRequest;
use crate::rag::RagService;
use crate::rag::StreamEvent;
use crate::AppConfig;
use crate::Result;

/// Simple spinner for showing progress
struct Spinner {
    message: String,
    running: Arc<AtomicBool>,
}

impl Spinner {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn start(&self) {
        let message = self.message.clone();
        let running = self.running.clone();
        running.store(true, Ordering::Relaxed);

        std::thread::spawn(move || {
            let frames = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
            let mut idx = 0;

            while running.load(Ordering::Relaxed) {
                print!("\r   {} {}...", frames[idx], message);
                io::stdout().flush().ok();
                idx = (idx + 1) % frames.len();
                std::thread::sleep(Duration::from_millis(80));
            }

            print!("\r{}\r", " ".repeat(80));
            io::stdout().flush().ok();
        });
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        std::thread::sleep(Duration::from_millis(100));
    }
}

/// Options of the `ask` command
pub struct AskOptions {
    pub user: Option<String>,
    pub response_type: Option<String>,
    pub top_k: Option<usize>,
    pub use_reranking: bool,
    pub stream: bool,
}

pub async fn handle_ask(config: &AppConfig, query: String, options: AskOptions) -> Result<()> {
    let user_id = options
        .user
        .unwrap_or_else(|| config.server.default_user_id.clone());

    print_info(&format!("🤖 Asking as {user_id}: \"{query}\""));

    let service = RagService::from_config(config)?;
    let mut request = RagRequest::new(query, user_id)
        .with_top_k(options.top_k.unwrap_or(config.rag.default_top_k))
        .with_reranking(options.use_reranking);
    request.forced_type = options.response_type;

    if options.stream {
        stream_answer(&service, &request).await
    } else {
        let spinner = Spinner::new("Thinking");
        spinner.start();
        let result = service.run(&request).await;
        spinner.stop();

        print_rag_result(&result?, true);
        Ok(())
    }
}

async fn stream_answer(service: &RagService, request: &RagRequest) -> Result<()> {
    let spinner = Spinner::new("Retrieving");
    spinner.start();
    let session = service.stream(request).await;
    spinner.stop();
    let mut session = session?;

    let mut printed_tokens = false;
    while let Some(event) = session.next_event().await {
        match event? {
            StreamEvent::Meta(meta) => {
                println!("📝 Type: {} ({} chunks)", meta.action, meta.context_chunks);
                println!();
            }
            StreamEvent::Token(token) => {
                printed_tokens = true;
                print!("{token}");
                io::stdout().flush()?;
            }
            StreamEvent::Done { response, .. } => {
                if !printed_tokens {
                    print!("{response}");
                }
                println!();
            }
        }
    }

    println!();
    println!("📚 Sources ({} chunks):", session.meta().context_chunks);
    print_sources(&session.meta().sources);
    Ok(())
}
