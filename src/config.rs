use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::embeddings::EmbeddingProvider;
use crate::llm::GenerationMode;

/// Prefix for environment overrides, e.g. `NEXQA__LLM__MODEL=llama3.2:3b`
const ENV_PREFIX: &str = "NEXQA";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub backtrace: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            backtrace: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `offline` = local Ollama model, `online` = Azure OpenAI deployment
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default = "default_ollama_endpoint")]
    pub ollama_endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_available_models")]
    pub available_models: Vec<String>,
    #[serde(default)]
    pub azure_endpoint: Option<String>,
    #[serde(default)]
    pub azure_api_key: Option<String>,
    #[serde(default = "default_azure_deployment")]
    pub azure_deployment: String,
    #[serde(default = "default_azure_api_version")]
    pub azure_api_version: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Generation calls routinely take tens of seconds
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_secs: u64,
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "gemma3:1b".to_string()
}

pub(crate) fn default_available_models() -> Vec<String> {
    [
        "gpt-oss:20b",
        "llama3.2:3b",
        "gemma3:1b",
        "deepseek-r1:latest",
        "qwen3:30b",
        "mistral:7b",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn default_azure_deployment() -> String {
    "gpt-4".to_string()
}

fn default_azure_api_version() -> String {
    "2024-02-01".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> usize {
    2048
}

fn default_llm_timeout() -> u64 {
    300
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            mode: GenerationMode::default(),
            ollama_endpoint: default_ollama_endpoint(),
            model: default_llm_model(),
            available_models: default_available_models(),
            azure_endpoint: None,
            azure_api_key: None,
            azure_deployment: default_azure_deployment(),
            azure_api_version: default_azure_api_version(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_llm_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub azure_endpoint: Option<String>,
    #[serde(default)]
    pub azure_api_key: Option<String>,
    #[serde(default = "default_azure_embedding_model")]
    pub azure_model: String,
    #[serde(default = "default_azure_api_version")]
    pub azure_api_version: String,
}

fn default_embedding_model() -> String {
    "nomic-embed-text:latest".to_string()
}

fn default_azure_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            endpoint: default_ollama_endpoint(),
            model: default_embedding_model(),
            azure_endpoint: None,
            azure_api_key: None,
            azure_model: default_azure_embedding_model(),
            azure_api_version: default_azure_api_version(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_chroma_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_store_timeout")]
    pub request_timeout_secs: u64,
}

fn default_chroma_endpoint() -> String {
    "http://localhost:8000".to_string()
}

fn default_collection() -> String {
    "harry_rag".to_string()
}

fn default_store_timeout() -> u64 {
    30
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: default_chroma_endpoint(),
            collection: default_collection(),
            request_timeout_secs: default_store_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cross-encoder service base URL; re-ranking degrades to passthrough when unset
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_cross_encoder")]
    pub model: String,
    #[serde(default = "default_rerank_timeout")]
    pub request_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_cross_encoder() -> String {
    "cross-encoder/ms-marco-MiniLM-L-12-v2".to_string()
}

fn default_rerank_timeout() -> u64 {
    60
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            model: default_cross_encoder(),
            request_timeout_secs: default_rerank_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    /// Capacity of the bounded token channel used by streamed answers
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_stream_buffer() -> usize {
    64
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub enable_cors: bool,
    /// Used when a request carries no `X-User-ID` header
    #[serde(default = "default_user_id")]
    pub default_user_id: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_user_id() -> String {
    "default_user".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: true,
            default_user_id: default_user_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default = "default_mcp_name")]
    pub server_name: String,
    #[serde(default = "default_mcp_user")]
    pub default_user_id: String,
}

fn default_mcp_name() -> String {
    "NexQA MCP".to_string()
}

fn default_mcp_user() -> String {
    "mcp_user".to_string()
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            server_name: default_mcp_name(),
            default_user_id: default_mcp_user(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub reranker: RerankerConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mcp: McpConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file, without environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file layered with `NEXQA__SECTION__KEY` environment overrides.
    ///
    /// The conventional `AZURE_OPENAI_API_KEY` / `AZURE_OPENAI_ENDPOINT` variables
    /// fill the Azure credentials for both generation and embeddings.
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let azure_key = std::env::var("AZURE_OPENAI_API_KEY").ok();
        let azure_endpoint = std::env::var("AZURE_OPENAI_ENDPOINT").ok();

        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .set_override_option("llm.azure_api_key", azure_key.clone())?
            .set_override_option("llm.azure_endpoint", azure_endpoint.clone())?
            .set_override_option("embeddings.azure_api_key", azure_key)?
            .set_override_option("embeddings.azure_endpoint", azure_endpoint)?
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file_with_env("config.toml")
        } else if Path::new("config.example.toml").exists() {
            tracing::warn!(
                "Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file_with_env("config.example.toml")
        } else {
            Err(crate::NexqaError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config file found. Please create config.toml or config.example.toml",
            )))
        }
    }

    /// Check endpoints and numeric bounds
    pub fn validate(&self) -> crate::Result<()> {
        check_url("llm.ollama_endpoint", &self.llm.ollama_endpoint)?;
        check_url("embeddings.endpoint", &self.embeddings.endpoint)?;
        check_url("vector_store.endpoint", &self.vector_store.endpoint)?;
        if let Some(endpoint) = &self.reranker.endpoint {
            check_url("reranker.endpoint", endpoint)?;
        }

        if self.llm.mode == GenerationMode::Online
            && (self.llm.azure_endpoint.is_none() || self.llm.azure_api_key.is_none())
        {
            return Err(crate::NexqaError::Config(
                "online mode requires llm.azure_endpoint and llm.azure_api_key \
                 (or AZURE_OPENAI_ENDPOINT / AZURE_OPENAI_API_KEY)"
                    .to_string(),
            ));
        }

        if self.rag.default_top_k == 0 {
            return Err(crate::NexqaError::Config(
                "rag.default_top_k must be at least 1".to_string(),
            ));
        }
        if self.rag.stream_buffer == 0 {
            return Err(crate::NexqaError::Config(
                "rag.stream_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get active generation model
    pub fn llm_model(&self) -> &str {
        &self.llm.model
    }

    /// Get generation mode
    pub fn generation_mode(&self) -> GenerationMode {
        self.llm.mode
    }

    /// Get generation request timeout
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.request_timeout_secs)
    }

    /// Get embedding model name for the configured provider
    pub fn embedding_model(&self) -> &str {
        match self.embeddings.provider {
            EmbeddingProvider::Ollama => &self.embeddings.model,
            EmbeddingProvider::Azure => &self.embeddings.azure_model,
        }
    }

    /// Get the bind address for the HTTP server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Whether a cross-encoder service is configured and enabled
    pub fn reranking_available(&self) -> bool {
        self.reranker.enabled && self.reranker.endpoint.is_some()
    }
}

fn check_url(field: &str, value: &str) -> crate::Result<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| crate::NexqaError::Config(format!("{field} is not a valid URL ({value}): {e}")))
}
