//! Text generation module
//!
//! The RAG pipeline talks to a [`GenerationClient`]; [`LlmService`] is the
//! production implementation backed by a local Ollama model (`offline`) or an
//! Azure OpenAI deployment (`online`).

pub mod client;
pub mod prompts;
pub mod streaming;

use async_trait::async_trait;
pub use client::LlmService;
pub use prompts::ChatMessage;
use serde::Deserialize;
use serde::Serialize;
pub use streaming::spawn_token_producer;
pub use streaming::TokenEvent;
pub use streaming::TokenReceiver;
use tokio::sync::mpsc;

use crate::errors::Result;

/// Where generation runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Local Ollama model
    #[default]
    Offline,
    /// Hosted Azure OpenAI deployment, needs credentials
    Online,
}

impl GenerationMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully composed generation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    /// Retrieved passages joined into one block
    pub context: String,
    /// Role and behaviour instructions
    pub sysprompt: String,
    /// The user query
    pub prompt: String,
    /// Extra formatting or requirement text
    pub spl_prompt: String,
    pub mode: GenerationMode,
}

/// Generation backend used by the pipeline and the classifier
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a complete answer
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Generate incrementally, sending each text fragment to `tx`.
    ///
    /// Returns once generation completes or the receiver is dropped.
    async fn generate_stream(
        &self,
        request: &GenerationRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<()>;

    /// Single-turn completion of a raw prompt, without the context/question framing
    async fn complete(&self, prompt: &str, mode: GenerationMode) -> Result<String>;

    /// Active model name
    fn model_name(&self) -> &str;
}
