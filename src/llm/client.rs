//! LLM service backed by Ollama (offline) and Azure OpenAI (online)

use std::ops::ControlFlow;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::info;

use super::prompts::clean_response;
use super::prompts::offline_messages;
use super::prompts::online_messages;
use super::prompts::ChatMessage;
use super::prompts::EMPTY_RESPONSE_NOTICE;
use super::GenerationClient;
use super::GenerationMode;
use super::GenerationRequest;
use crate::config::AppConfig;
use crate::errors::NexqaError;
use crate::errors::Result;

/// Azure OpenAI deployment target
#[derive(Debug, Clone)]
struct AzureTarget {
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
}

impl AzureTarget {
    fn chat_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

/// Generation client for both execution modes
#[derive(Debug, Clone)]
pub struct LlmService {
    client: Client,
    ollama_endpoint: String,
    model: String,
    azure: Option<AzureTarget>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmService {
    /// Create a new LLM service
    ///
    /// # Errors
    /// - HTTP client build errors
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.llm_timeout())
            .build()
            .map_err(|e| NexqaError::Http(e.to_string()))?;

        let azure = match (&config.llm.azure_endpoint, &config.llm.azure_api_key) {
            (Some(endpoint), Some(api_key)) => Some(AzureTarget {
                endpoint: endpoint.clone(),
                api_key: api_key.clone(),
                deployment: config.llm.azure_deployment.clone(),
                api_version: config.llm.azure_api_version.clone(),
            }),
            _ => None,
        };

        info!(
            "LLM service ready: model={}, mode={}, azure={}",
            config.llm.model,
            config.llm.mode,
            azure.is_some()
        );

        Ok(Self {
            client,
            ollama_endpoint: config.llm.ollama_endpoint.trim_end_matches('/').to_string(),
            model: config.llm.model.clone(),
            azure,
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        })
    }

    fn azure(&self) -> Result<&AzureTarget> {
        self.azure.as_ref().ok_or_else(|| {
            NexqaError::Config(
                "Azure OpenAI credentials are required for online mode. \
                 Set AZURE_OPENAI_API_KEY and AZURE_OPENAI_ENDPOINT."
                    .to_string(),
            )
        })
    }

    async fn ollama_chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let url = format!("{}/api/chat", self.ollama_endpoint);
        debug!("Calling Ollama chat API: {} ({})", url, self.model);

        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| NexqaError::generation(format!("Ollama LLM call failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(NexqaError::generation(format!(
                "Ollama LLM call failed ({status}): {error_text}"
            )));
        }

        let body: OllamaChatResponse = response.json().await.map_err(|e| {
            NexqaError::generation(format!("Ollama returned an unreadable response: {e}"))
        })?;
        Ok(body.message.content)
    }

    async fn azure_chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let azure = self.azure()?;
        debug!("Calling Azure OpenAI deployment: {}", azure.deployment);

        let request = AzureChatRequest {
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: None,
        };
        let response = self
            .client
            .post(azure.chat_url())
            .header("api-key", &azure.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NexqaError::generation(format!("Azure OpenAI call failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(NexqaError::generation(format!(
                "Azure OpenAI call failed ({status}): {error_text}"
            )));
        }

        let body: AzureChatResponse = response.json().await.map_err(|e| {
            NexqaError::generation(format!("Azure OpenAI returned an unreadable response: {e}"))
        })?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| NexqaError::generation("Azure OpenAI returned no choices"))
    }

    async fn ollama_stream(
        &self,
        messages: Vec<ChatMessage>,
        tx: mpsc::Sender<String>,
    ) -> Result<()> {
        let url = format!("{}/api/chat", self.ollama_endpoint);
        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: true,
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| NexqaError::generation(format!("Ollama stream failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(NexqaError::generation(format!(
                "Ollama stream failed ({status}): {error_text}"
            )));
        }

        // NDJSON, one chunk object per line; lines may straddle network chunks
        let mut bytes = response.bytes_stream();
        let mut lines = LineBuffer::default();
        while let Some(chunk) = bytes.next().await {
            let chunk =
                chunk.map_err(|e| NexqaError::generation(format!("Ollama stream broke: {e}")))?;
            lines.push(&chunk);
            while let Some(line) = lines.next_line() {
                if forward_ollama_line(&line, &tx).await.is_break() {
                    return Ok(());
                }
            }
        }
        if let Some(line) = lines.finish() {
            let _ = forward_ollama_line(&line, &tx).await;
        }
        Ok(())
    }

    async fn azure_stream(&self, messages: Vec<ChatMessage>, tx: mpsc::Sender<String>) -> Result<()> {
        let azure = self.azure()?;
        let request = AzureChatRequest {
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: Some(true),
        };
        let response = self
            .client
            .post(azure.chat_url())
            .header("api-key", &azure.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NexqaError::generation(format!("Azure OpenAI stream failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(NexqaError::generation(format!(
                "Azure OpenAI stream failed ({status}): {error_text}"
            )));
        }

        // Server-sent events: `data: {json}` lines terminated by `data: [DONE]`
        let mut bytes = response.bytes_stream();
        let mut lines = LineBuffer::default();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk
                .map_err(|e| NexqaError::generation(format!("Azure OpenAI stream broke: {e}")))?;
            lines.push(&chunk);
            while let Some(line) = lines.next_line() {
                if forward_azure_line(&line, &tx).await.is_break() {
                    return Ok(());
                }
            }
        }
        if let Some(line) = lines.finish() {
            let _ = forward_azure_line(&line, &tx).await;
        }
        Ok(())
    }
}

/// Raw response bytes split into lines
///
/// Bytes are only decoded once a whole line has arrived, so a multi-byte
/// character split across network chunks stays intact.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Next complete line, trimmed
    fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(decode_line(&line))
    }

    /// Trailing line left without a terminator when the body ended
    fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let line = decode_line(&rest);
        (!line.is_empty()).then_some(line)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(line) => line.trim().to_string(),
        Err(e) => {
            debug!("Stream line is not valid UTF-8: {e}");
            String::from_utf8_lossy(bytes).trim().to_string()
        }
    }
}

/// Send the content of one Ollama NDJSON line; `Break` once done or the consumer left
async fn forward_ollama_line(line: &str, tx: &mpsc::Sender<String>) -> ControlFlow<()> {
    if line.is_empty() {
        return ControlFlow::Continue(());
    }
    let Ok(parsed) = serde_json::from_str::<OllamaStreamChunk>(line) else {
        debug!("Skipping unparseable stream line: {line}");
        return ControlFlow::Continue(());
    };
    if !parsed.message.content.is_empty() && tx.send(parsed.message.content).await.is_err() {
        return ControlFlow::Break(());
    }
    if parsed.done {
        ControlFlow::Break(())
    } else {
        ControlFlow::Continue(())
    }
}

/// Send the delta of one Azure SSE line; `Break` on `[DONE]` or when the consumer left
async fn forward_azure_line(line: &str, tx: &mpsc::Sender<String>) -> ControlFlow<()> {
    let Some(payload) = line.strip_prefix("data:").map(str::trim_start) else {
        return ControlFlow::Continue(());
    };
    if payload == "[DONE]" {
        return ControlFlow::Break(());
    }
    let Ok(parsed) = serde_json::from_str::<AzureStreamChunk>(payload) else {
        return ControlFlow::Continue(());
    };
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .unwrap_or_default();
    if !content.is_empty() && tx.send(content).await.is_err() {
        return ControlFlow::Break(());
    }
    ControlFlow::Continue(())
}

#[async_trait]
impl GenerationClient for LlmService {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        match request.mode {
            GenerationMode::Offline => {
                let raw = self.ollama_chat(offline_messages(request)).await?;
                let answer = clean_response(&raw);
                if answer.is_empty() {
                    return Ok(EMPTY_RESPONSE_NOTICE.to_string());
                }
                Ok(answer)
            }
            GenerationMode::Online => self.azure_chat(online_messages(request)).await,
        }
    }

    async fn generate_stream(
        &self,
        request: &GenerationRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<()> {
        match request.mode {
            GenerationMode::Offline => self.ollama_stream(offline_messages(request), tx).await,
            GenerationMode::Online => self.azure_stream(online_messages(request), tx).await,
        }
    }

    async fn complete(&self, prompt: &str, mode: GenerationMode) -> Result<String> {
        let messages = vec![ChatMessage::user(prompt)];
        match mode {
            GenerationMode::Offline => self.ollama_chat(messages).await,
            GenerationMode::Online => self.azure_chat(messages).await,
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// Ollama API types
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaStreamChunk {
    message: ChatMessage,
    #[serde(default)]
    done: bool,
}

// Azure OpenAI API types
#[derive(Debug, Serialize)]
struct AzureChatRequest {
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct AzureChatResponse {
    choices: Vec<AzureChoice>,
}

#[derive(Debug, Deserialize)]
struct AzureChoice {
    message: AzureMessage,
}

#[derive(Debug, Deserialize)]
struct AzureMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AzureStreamChunk {
    #[serde(default)]
    choices: Vec<AzureStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct AzureStreamChoice {
    delta: AzureDelta,
}

#[derive(Debug, Deserialize)]
struct AzureDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncReadExt;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio::net::TcpStream;

    use super::*;

    /// Read one request (headers plus `Content-Length` body) off the socket
    async fn read_request(socket: &mut TcpStream) {
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let line = line.to_ascii_lowercase();
                        line.strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if request.len() >= head_end + 4 + content_length {
                    return;
                }
            }
        }
    }

    /// Serve one chunked response, writing each body part as its own HTTP chunk
    async fn serve_chunked(content_type: &'static str, parts: Vec<Vec<u8>>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            for part in parts {
                socket
                    .write_all(format!("{:X}\r\n", part.len()).as_bytes())
                    .await
                    .unwrap();
                socket.write_all(&part).await.unwrap();
                socket.write_all(b"\r\n").await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            socket.write_all(b"0\r\n\r\n").await.unwrap();
            socket.flush().await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Split `body` right after the first byte of its first multi-byte character
    fn split_inside_char(body: &str) -> Vec<Vec<u8>> {
        let bytes = body.as_bytes();
        let split = bytes.iter().position(|b| *b >= 0xC0).unwrap() + 1;
        vec![bytes[..split].to_vec(), bytes[split..].to_vec()]
    }

    async fn drain(mut rx: mpsc::Receiver<String>) -> Vec<String> {
        let mut tokens = Vec::new();
        while let Some(token) = rx.recv().await {
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn test_line_buffer_waits_for_whole_character() {
        let mut lines = LineBuffer::default();
        let bytes = "café\nnext".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;

        lines.push(&bytes[..split]);
        assert_eq!(lines.next_line(), None);
        lines.push(&bytes[split..]);
        assert_eq!(lines.next_line().as_deref(), Some("café"));
        assert_eq!(lines.next_line(), None);
        assert_eq!(lines.finish().as_deref(), Some("next"));
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn test_line_buffer_ignores_blank_tail() {
        let mut lines = LineBuffer::default();
        lines.push(b"data: x\r\n\r\n");
        assert_eq!(lines.next_line().as_deref(), Some("data: x"));
        assert_eq!(lines.next_line().as_deref(), Some(""));
        assert_eq!(lines.finish(), None);
    }

    #[tokio::test]
    async fn test_ollama_stream_keeps_multibyte_tokens_and_last_line() {
        // Last line has no trailing newline
        let body = concat!(
            r#"{"message":{"role":"assistant","content":"café"},"done":false}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":" 🎉"},"done":true}"#,
        );
        let mut config = AppConfig::default();
        config.llm.ollama_endpoint =
            serve_chunked("application/x-ndjson", split_inside_char(body)).await;
        let service = LlmService::new(&config).unwrap();

        let (tx, rx) = mpsc::channel(16);
        service
            .ollama_stream(vec![ChatMessage::user("hi")], tx)
            .await
            .unwrap();

        assert_eq!(drain(rx).await, ["café", " 🎉"]);
    }

    #[tokio::test]
    async fn test_azure_stream_keeps_multibyte_tokens_and_last_line() {
        let body = concat!(
            r#"data: {"choices":[{"delta":{"content":"über"}}]}"#,
            "\n\n",
            r#"data: {"choices":[{"delta":{"content":"prüfen"}}]}"#,
        );
        let mut config = AppConfig::default();
        config.llm.azure_endpoint =
            Some(serve_chunked("text/event-stream", split_inside_char(body)).await);
        config.llm.azure_api_key = Some("key".to_string());
        let service = LlmService::new(&config).unwrap();

        let (tx, rx) = mpsc::channel(16);
        service
            .azure_stream(vec![ChatMessage::user("hi")], tx)
            .await
            .unwrap();

        assert_eq!(drain(rx).await, ["über", "prüfen"]);
    }

    #[test]
    fn test_service_without_azure_credentials() {
        let service = LlmService::new(&AppConfig::default()).unwrap();
        assert_eq!(service.model_name(), "gemma3:1b");
        assert!(matches!(service.azure(), Err(NexqaError::Config(_))));
    }

    #[test]
    fn test_azure_chat_url() {
        let mut config = AppConfig::default();
        config.llm.azure_endpoint = Some("https://acme.openai.azure.com/".to_string());
        config.llm.azure_api_key = Some("key".to_string());
        let service = LlmService::new(&config).unwrap();
        assert_eq!(
            service.azure().unwrap().chat_url(),
            "https://acme.openai.azure.com/openai/deployments/gpt-4/chat/completions?api-version=2024-02-01"
        );
    }

    #[test]
    fn test_ollama_request_serialization() {
        let request = OllamaChatRequest {
            model: "gemma3:1b",
            messages: vec![ChatMessage::user("hi")],
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gemma3:1b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_stream_chunk_parsing() {
        let chunk: OllamaStreamChunk = serde_json::from_str(
            r#"{"model":"gemma3:1b","message":{"role":"assistant","content":"Hi"},"done":false}"#,
        )
        .unwrap();
        assert_eq!(chunk.message.content, "Hi");
        assert!(!chunk.done);

        let chunk: AzureStreamChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Yo"}}]}"#).unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Yo"));
    }

    #[tokio::test]
    async fn test_online_generation_without_credentials_is_config_error() {
        let service = LlmService::new(&AppConfig::default()).unwrap();
        let err = service
            .complete("hello", GenerationMode::Online)
            .await
            .unwrap_err();
        assert!(matches!(err, NexqaError::Config(_)));
    }
}
