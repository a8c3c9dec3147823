//! Embedding API clients for the supported providers

use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::EmbeddingsConfig;
use crate::errors::NexqaError;
use crate::errors::Result;

/// Supported embedding providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Ollama local embeddings
    #[default]
    Ollama,
    /// Azure OpenAI embeddings deployment
    Azure,
}

/// Client for generating query embeddings
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    provider: EmbeddingProvider,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    api_version: String,
    client: Client,
}

impl EmbeddingClient {
    /// Create a new embedding client
    ///
    /// # Errors
    /// - HTTP client build errors
    /// - Azure provider selected without endpoint or key
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| NexqaError::Http(e.to_string()))?;

        let (model, endpoint, api_key) = match config.provider {
            EmbeddingProvider::Ollama => (config.model.clone(), config.endpoint.clone(), None),
            EmbeddingProvider::Azure => {
                let endpoint = config.azure_endpoint.clone().ok_or_else(|| {
                    NexqaError::Config(
                        "Azure OpenAI credentials not found. Set AZURE_OPENAI_API_KEY and AZURE_OPENAI_ENDPOINT."
                            .to_string(),
                    )
                })?;
                let api_key = config.azure_api_key.clone().ok_or_else(|| {
                    NexqaError::Config(
                        "Azure OpenAI credentials not found. Set AZURE_OPENAI_API_KEY and AZURE_OPENAI_ENDPOINT."
                            .to_string(),
                    )
                })?;
                (config.azure_model.clone(), endpoint, Some(api_key))
            }
        };

        Ok(Self {
            provider: config.provider,
            model,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            api_version: config.azure_api_version.clone(),
            client,
        })
    }

    pub const fn provider(&self) -> EmbeddingProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate embedding for a single text
    ///
    /// # Errors
    /// - API request failures (network errors, timeouts, authentication failures)
    /// - Invalid API responses (malformed JSON, missing embedding)
    pub async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        match self.provider {
            EmbeddingProvider::Ollama => self.generate_ollama(text).await,
            EmbeddingProvider::Azure => self.generate_azure(text).await,
        }
    }

    /// Generate embedding using Ollama API
    async fn generate_ollama(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.endpoint);
        debug!("Calling Ollama embeddings API: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&OllamaRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| NexqaError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NexqaError::Embedding(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| NexqaError::Embedding(format!("Failed to parse response: {e}")))?;

        if result.embedding.is_empty() {
            return Err(NexqaError::Embedding("Empty embedding in response".to_string()));
        }
        Ok(result.embedding)
    }

    /// Generate embedding using an Azure OpenAI deployment
    async fn generate_azure(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| NexqaError::Config("Azure OpenAI API key not provided".to_string()))?;

        #[derive(Serialize)]
        struct AzureRequest<'a> {
            input: &'a str,
        }

        #[derive(Deserialize)]
        struct AzureResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        let url = format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            self.endpoint, self.model, self.api_version
        );
        debug!("Calling Azure OpenAI embeddings API: {}", url);

        let response = self
            .client
            .post(&url)
            .header("api-key", api_key)
            .json(&AzureRequest { input: text })
            .send()
            .await
            .map_err(|e| NexqaError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NexqaError::Embedding(format!(
                "Azure OpenAI API error ({status}): {error_text}"
            )));
        }

        let result: AzureResponse = response
            .json()
            .await
            .map_err(|e| NexqaError::Embedding(format!("Failed to parse response: {e}")))?;

        result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| NexqaError::Embedding("No embedding in response".to_string()))
    }
}
