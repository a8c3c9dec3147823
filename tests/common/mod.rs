#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use nexqa::llm::GenerationClient;
use nexqa::llm::GenerationMode;
use nexqa::llm::GenerationRequest;
use nexqa::rag::Classification;
use nexqa::rag::FallbackReason;
use nexqa::rag::IntentClassifier;
use nexqa::rag::RagService;
use nexqa::rag::RerankOutcome;
use nexqa::rag::Reranker;
use nexqa::vector_store::Passage;
use nexqa::vector_store::VectorStore;
use nexqa::NexqaError;
use nexqa::Result;
use tokio::sync::mpsc;

/// Store answering from a fixed query -> passages table
#[derive(Default)]
pub struct MockStore {
    pub results: HashMap<String, Vec<Passage>>,
    pub sources: Vec<String>,
    pub fail: bool,
    /// (query, user_id, n_results) per call
    pub calls: Mutex<Vec<(String, String, usize)>>,
}

impl MockStore {
    pub fn with(mut self, query: &str, passages: Vec<Passage>) -> Self {
        self.results.insert(query.to_string(), passages);
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for MockStore {
    async fn query(&self, text: &str, user_id: &str, n_results: usize) -> Result<Vec<Passage>> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), user_id.to_string(), n_results));
        if self.fail {
            return Err(NexqaError::Http("connection refused".to_string()));
        }
        Ok(self.results.get(text).cloned().unwrap_or_default())
    }

    async fn list_sources(&self, _user_id: &str) -> Result<Vec<String>> {
        if self.fail {
            return Err(NexqaError::Http("connection refused".to_string()));
        }
        Ok(self.sources.clone())
    }
}

/// Generator that echoes the template it was given
#[derive(Default)]
pub struct MockGenerator {
    /// Fragments sent by `generate_stream`
    pub tokens: Vec<String>,
    pub fail: bool,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    pub fn streaming(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn answer_for(request: &GenerationRequest) -> String {
    format!("answer to '{}' from {} chars", request.prompt, request.context.len())
}

#[async_trait]
impl GenerationClient for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(NexqaError::generation("model not loaded"));
        }
        Ok(answer_for(request))
    }

    async fn generate_stream(
        &self,
        request: &GenerationRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(NexqaError::generation("model not loaded"));
        }
        for token in &self.tokens {
            if tx.send(token.clone()).await.is_err() {
                break;
            }
        }
        Ok(())
    }

    async fn complete(&self, _prompt: &str, _mode: GenerationMode) -> Result<String> {
        Ok("ask".to_string())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Classifier returning canned labels in call order, repeating the last one
pub struct StubClassifier {
    pub labels: Vec<&'static str>,
    pub calls: Mutex<usize>,
}

impl StubClassifier {
    pub fn returning(label: &'static str) -> Self {
        Self::sequence(&[label])
    }

    pub fn sequence(labels: &[&'static str]) -> Self {
        Self {
            labels: labels.to_vec(),
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self::sequence(&[])
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl IntentClassifier for StubClassifier {
    async fn classify(&self, _query: &str, _context: &str) -> Classification {
        let mut calls = self.calls.lock().unwrap();
        let index = *calls;
        *calls += 1;
        match self.labels.get(index).or_else(|| self.labels.last()) {
            Some(label) => Classification::Intent((*label).to_string()),
            None => Classification::Fallback(FallbackReason::Failed),
        }
    }
}

/// Reranker that reverses its input, or passes through when failing
#[derive(Default)]
pub struct MockReranker {
    pub fail: bool,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl MockReranker {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Reranker for MockReranker {
    async fn rerank(&self, _query: &str, documents: Vec<String>) -> RerankOutcome {
        self.calls.lock().unwrap().push(documents.clone());
        if self.fail {
            return RerankOutcome::Passthrough {
                documents,
                reason: "scoring service returned 503".to_string(),
            };
        }
        RerankOutcome::Ranked(documents.into_iter().rev().take(3).collect())
    }
}

pub fn passage(content: &str, distance: f32, source: &str) -> Passage {
    Passage::new(content, distance).with_metadata("source", source)
}

pub fn four_passages() -> Vec<Passage> {
    vec![
        passage("p1", 0.1, "spec.pdf"),
        passage("p2", 0.2, "spec.pdf"),
        passage("p3", 0.3, "plan.docx"),
        passage("p4", 0.4, "plan.docx"),
    ]
}

pub struct Harness {
    pub store: Arc<MockStore>,
    pub generator: Arc<MockGenerator>,
    pub classifier: Arc<StubClassifier>,
    pub reranker: Arc<MockReranker>,
    pub service: RagService,
}

pub fn harness(
    store: MockStore,
    generator: MockGenerator,
    classifier: StubClassifier,
    reranker: MockReranker,
) -> Harness {
    let store = Arc::new(store);
    let generator = Arc::new(generator);
    let classifier = Arc::new(classifier);
    let reranker = Arc::new(reranker);
    let service = RagService::from_services(
        store.clone(),
        generator.clone(),
        classifier.clone(),
        reranker.clone(),
    )
    .unwrap();
    Harness {
        store,
        generator,
        classifier,
        reranker,
        service,
    }
}
