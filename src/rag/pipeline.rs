//! Complete RAG pipeline: Retrieve -> Rerank -> Classify -> Generate

use std::sync::Arc;

use futures::stream;
use futures::Stream;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::info_span;
use tracing::warn;
use tracing::Instrument;
use uuid::Uuid;

use super::classifier::IntentClassifier;
use super::classifier::LlmActionClassifier;
use super::context::ContextAssembler;
use super::reranker::CrossEncoderReranker;
use super::reranker::DisabledReranker;
use super::reranker::RerankOutcome;
use super::reranker::Reranker;
use super::templates::ActionType;
use super::templates::TemplateRegistry;
use crate::config::AppConfig;
use crate::embeddings::EmbeddingClient;
use crate::errors::Result;
use crate::llm::spawn_token_producer;
use crate::llm::GenerationClient;
use crate::llm::GenerationMode;
use crate::llm::GenerationRequest;
use crate::llm::LlmService;
use crate::llm::TokenEvent;
use crate::llm::TokenReceiver;
use crate::vector_store::ChromaStore;
use crate::vector_store::Passage;
use crate::vector_store::VectorStore;

/// Query used when the user's own query retrieves nothing
pub const FALLBACK_QUERY: &str = "about";

pub const DEFAULT_TOP_K: usize = 5;

const DEFAULT_STREAM_BUFFER: usize = 64;

/// Parameters of one RAG query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RagRequest {
    pub query: String,
    pub user_id: String,
    /// Skips classification when set and non-empty
    pub forced_type: Option<String>,
    pub top_k: usize,
    pub use_reranking: bool,
}

impl RagRequest {
    pub fn new(query: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: user_id.into(),
            forced_type: None,
            top_k: DEFAULT_TOP_K,
            use_reranking: true,
        }
    }

    #[must_use]
    pub fn with_type(mut self, forced_type: impl Into<String>) -> Self {
        self.forced_type = Some(forced_type.into());
        self
    }

    #[must_use]
    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub const fn with_reranking(mut self, use_reranking: bool) -> Self {
        self.use_reranking = use_reranking;
        self
    }
}

/// Answer to a RAG query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResult {
    pub query: String,
    #[serde(rename = "type")]
    pub action: ActionType,
    /// Passages retrieved, after the empty-result fallback
    pub context_chunks: usize,
    pub response: String,
    pub sources: Vec<Passage>,
}

/// Announcement sent before any streamed token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMeta {
    pub query: String,
    #[serde(rename = "type")]
    pub action: ActionType,
    pub context_chunks: usize,
    pub sources: Vec<Passage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Meta(StreamMeta),
    Token(String),
    Done { response: String, action: ActionType },
}

impl StreamEvent {
    /// Event name used on the wire
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Meta(_) => "meta",
            Self::Token(_) => "token",
            Self::Done { .. } => "done",
        }
    }
}

/// Everything decided before generation starts
struct PreparedQuery {
    sources: Vec<Passage>,
    action: ActionType,
    generation: GenerationRequest,
}

/// RAG orchestrator
#[derive(Clone)]
pub struct RagService {
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn GenerationClient>,
    classifier: Arc<dyn IntentClassifier>,
    reranker: Arc<dyn Reranker>,
    registry: Arc<TemplateRegistry>,
    context_assembler: ContextAssembler,
    mode: GenerationMode,
    stream_buffer: usize,
}

impl RagService {
    /// Wire the production collaborators described by `config`
    ///
    /// # Errors
    /// - Embedding or generation provider misconfiguration (e.g. missing Azure credentials)
    /// - HTTP client construction failures
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let embeddings = EmbeddingClient::new(&config.embeddings)?;
        let store: Arc<dyn VectorStore> = Arc::new(ChromaStore::new(config, embeddings)?);
        let generator: Arc<dyn GenerationClient> = Arc::new(LlmService::new(config)?);
        let classifier = Arc::new(LlmActionClassifier::new(
            generator.clone(),
            config.generation_mode(),
        ));
        let reranker: Arc<dyn Reranker> = match &config.reranker.endpoint {
            Some(endpoint) if config.reranker.enabled => {
                Arc::new(CrossEncoderReranker::new(endpoint, &config.reranker)?)
            }
            _ => {
                info!("Cross-encoder reranking disabled");
                Arc::new(DisabledReranker)
            }
        };

        Ok(Self::from_services(store, generator, classifier, reranker)?
            .with_mode(config.generation_mode())
            .with_stream_buffer(config.rag.stream_buffer))
    }

    /// Create from existing collaborators
    ///
    /// # Errors
    /// Fails if the template registry does not validate
    pub fn from_services(
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn GenerationClient>,
        classifier: Arc<dyn IntentClassifier>,
        reranker: Arc<dyn Reranker>,
    ) -> Result<Self> {
        Ok(Self {
            store,
            generator,
            classifier,
            reranker,
            registry: Arc::new(TemplateRegistry::builtin()?),
            context_assembler: ContextAssembler::default(),
            mode: GenerationMode::default(),
            stream_buffer: DEFAULT_STREAM_BUFFER,
        })
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_stream_buffer(mut self, capacity: usize) -> Self {
        self.stream_buffer = capacity.max(1);
        self
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Retrieve passages without generating
    ///
    /// # Errors
    /// Vector store failures, reported as retrieval errors
    pub async fn search(&self, query: &str, user_id: &str, top_k: usize) -> Result<Vec<Passage>> {
        self.store
            .query(query, user_id, top_k)
            .await
            .map_err(|e| e.into_retrieval(query))
    }

    /// Answer a query with a fully generated response
    ///
    /// # Errors
    /// - Retrieval failures (including the `"about"` fallback query)
    /// - Generation failures, tagged with the selected response type
    pub async fn run(&self, request: &RagRequest) -> Result<RagResult> {
        let span = info_span!("rag_query", request_id = %Uuid::new_v4());
        self.answer(request).instrument(span).await
    }

    async fn answer(&self, request: &RagRequest) -> Result<RagResult> {
        info!("Processing RAG query for {}: {}", request.user_id, request.query);
        let prepared = self.prepare(request).await?;

        debug!("Generating {} response", prepared.action);
        let response = self
            .generator
            .generate(&prepared.generation)
            .await
            .map_err(|e| e.into_generation(prepared.action.as_str()))?;

        info!("RAG query completed ({} sources)", prepared.sources.len());
        Ok(RagResult {
            query: request.query.clone(),
            action: prepared.action,
            context_chunks: prepared.sources.len(),
            response,
            sources: prepared.sources,
        })
    }

    /// Answer a query incrementally
    ///
    /// Retrieval, re-ranking and classification complete before this returns;
    /// generation runs on a background task feeding the session.
    ///
    /// # Errors
    /// Retrieval failures. Generation failures surface through the session.
    pub async fn stream(&self, request: &RagRequest) -> Result<StreamSession> {
        let span = info_span!("rag_stream", request_id = %Uuid::new_v4());
        info!(parent: &span, "Processing streaming RAG query for {}: {}", request.user_id, request.query);
        let prepared = self.prepare(request).instrument(span).await?;

        let receiver = spawn_token_producer(
            self.generator.clone(),
            prepared.generation,
            self.stream_buffer,
        );

        Ok(StreamSession {
            meta: StreamMeta {
                query: request.query.clone(),
                action: prepared.action,
                context_chunks: prepared.sources.len(),
                sources: prepared.sources,
            },
            receiver,
            service: self.clone(),
            request: request.clone(),
            accumulated: String::new(),
            token_count: 0,
            meta_sent: false,
            finished: false,
        })
    }

    async fn prepare(&self, request: &RagRequest) -> Result<PreparedQuery> {
        // Step 1: retrieve, retrying once with the fallback query
        debug!("Step 1: Retrieving up to {} passages", request.top_k);
        let mut sources = self
            .search(&request.query, &request.user_id, request.top_k)
            .await?;
        if sources.is_empty() {
            info!("No passages for query, retrying with '{}'", FALLBACK_QUERY);
            sources = self
                .search(FALLBACK_QUERY, &request.user_id, request.top_k)
                .await?;
        }
        debug!("Retrieved {} passages", sources.len());

        // Step 2: assemble context, re-ranked when there is something to order
        let mut context = self.context_assembler.assemble(&sources);
        if request.use_reranking && sources.len() >= 2 {
            debug!("Step 2: Re-ranking {} passages", sources.len());
            let documents = sources.iter().map(|p| p.content.clone()).collect();
            match self.reranker.rerank(&request.query, documents).await {
                RerankOutcome::Ranked(ranked) => {
                    context = self.context_assembler.assemble_texts(&ranked);
                }
                RerankOutcome::Passthrough { reason, .. } => {
                    warn!("Re-ranking skipped, keeping retrieval order: {}", reason);
                }
            }
        }

        // Step 3: resolve the response type
        let intent = match request.forced_type.as_deref().filter(|t| !t.is_empty()) {
            Some(forced) => forced.to_string(),
            None => {
                let classification = self.classifier.classify(&request.query, &context).await;
                classification.intent().to_string()
            }
        };
        let (template, tier) = self.registry.resolve_with_tier(&intent);
        info!(
            "Intent '{}' resolved to '{}' ({:?} match)",
            intent, template.action, tier
        );

        Ok(PreparedQuery {
            sources,
            action: template.action,
            generation: GenerationRequest {
                context,
                sysprompt: template.system_prompt.to_string(),
                prompt: request.query.clone(),
                spl_prompt: template.special_prompt.to_string(),
                mode: self.mode,
            },
        })
    }
}

/// One streamed answer: a [`StreamMeta`] announcement, tokens, then `Done`
///
/// If generation ends without producing a token, the session answers the same
/// request through [`RagService::run`] and reports that response and its type
/// in `Done`.
pub struct StreamSession {
    meta: StreamMeta,
    receiver: TokenReceiver,
    service: RagService,
    request: RagRequest,
    accumulated: String,
    token_count: usize,
    meta_sent: bool,
    finished: bool,
}

impl StreamSession {
    pub fn meta(&self) -> &StreamMeta {
        &self.meta
    }

    /// Next event, `None` after `Done` or an error
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent>> {
        if !self.meta_sent {
            self.meta_sent = true;
            return Some(Ok(StreamEvent::Meta(self.meta.clone())));
        }
        if self.finished {
            return None;
        }

        match self.receiver.next().await {
            Some(TokenEvent::Token(token)) => {
                self.token_count += 1;
                self.accumulated.push_str(&token);
                Some(Ok(StreamEvent::Token(token)))
            }
            Some(TokenEvent::Failed(e)) => {
                self.finished = true;
                Some(Err(e.into_generation(self.meta.action.as_str())))
            }
            Some(TokenEvent::End) | None => {
                self.finished = true;
                let mut action = self.meta.action;
                if self.token_count == 0 {
                    warn!("Stream produced no tokens, falling back to a full response");
                    match self.service.run(&self.request).await {
                        Ok(result) => {
                            // The full response re-classifies, report the template it used
                            action = result.action;
                            self.accumulated = result.response;
                        }
                        Err(e) => return Some(Err(e)),
                    }
                }
                Some(Ok(StreamEvent::Done {
                    response: self.accumulated.clone(),
                    action,
                }))
            }
        }
    }

    /// Drain the session, returning the final response
    ///
    /// # Errors
    /// The first error the session reports
    pub async fn collect(mut self) -> Result<String> {
        while let Some(event) = self.next_event().await {
            if let StreamEvent::Done { response, .. } = event? {
                return Ok(response);
            }
        }
        Ok(self.accumulated)
    }

    /// Adapt the session into a [`Stream`] of events
    pub fn into_event_stream(self) -> impl Stream<Item = Result<StreamEvent>> + Send {
        stream::unfold(self, |mut session| async move {
            session.next_event().await.map(|event| (event, session))
        })
    }
}
