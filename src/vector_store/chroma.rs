//! Chroma REST gateway

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::source_of;
use super::Metadata;
use super::Passage;
use super::VectorStore;
use crate::config::AppConfig;
use crate::embeddings::EmbeddingClient;
use crate::errors::NexqaError;
use crate::errors::Result;

/// Chunks returned when a similarity query yields no result row at all
const UNRANKED_FALLBACK_LIMIT: usize = 5;

/// Vector store backed by a Chroma server; query text is embedded client-side
pub struct ChromaStore {
    client: Client,
    endpoint: String,
    collection: String,
    collection_id: OnceCell<String>,
    embeddings: EmbeddingClient,
}

impl ChromaStore {
    pub fn new(config: &AppConfig, embeddings: EmbeddingClient) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.vector_store.request_timeout_secs))
            .build()
            .map_err(|e| NexqaError::Http(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.vector_store.endpoint.trim_end_matches('/').to_string(),
            collection: config.vector_store.collection.clone(),
            collection_id: OnceCell::new(),
            embeddings,
        })
    }

    async fn collection_id(&self) -> Result<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let url = format!("{}/api/v1/collections/{}", self.endpoint, self.collection);
                let response = self.client.get(&url).send().await?;
                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(NexqaError::Http(format!(
                        "collection '{}' lookup failed ({status}): {body}",
                        self.collection
                    )));
                }
                let collection: CollectionInfo = response.json().await?;
                info!("Resolved Chroma collection {} -> {}", self.collection, collection.id);
                Ok(collection.id)
            })
            .await?;
        Ok(id)
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let id = self.collection_id().await?;
        let url = format!("{}/api/v1/collections/{id}/{operation}", self.endpoint);
        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(NexqaError::Http(format!(
                "Chroma {operation} failed ({status}): {text}"
            )));
        }
        Ok(response.json().await?)
    }

    async fn first_chunks(&self, user_id: &str) -> Result<Vec<Passage>> {
        let response: GetResponse = self
            .post(
                "get",
                json!({
                    "where": { "user_id": user_id },
                    "limit": UNRANKED_FALLBACK_LIMIT,
                    "include": ["documents", "metadatas"],
                }),
            )
            .await?;
        Ok(passages_from_get(response))
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn query(&self, text: &str, user_id: &str, n_results: usize) -> Result<Vec<Passage>> {
        debug!("Chroma query for user {}: {} (n={})", user_id, text, n_results);

        let outcome: Result<Vec<Passage>> = async {
            let embedding = self.embeddings.generate(text).await?;
            let response: QueryResponse = self
                .post(
                    "query",
                    json!({
                        "query_embeddings": [embedding],
                        "n_results": n_results,
                        "where": { "user_id": user_id },
                        "include": ["documents", "metadatas", "distances"],
                    }),
                )
                .await?;

            match passages_from_query(response) {
                Some(passages) => Ok(passages),
                None => {
                    warn!("Chroma returned no result row, using first stored chunks");
                    self.first_chunks(user_id).await
                }
            }
        }
        .await;

        outcome.map_err(|e| e.into_retrieval(text))
    }

    async fn list_sources(&self, user_id: &str) -> Result<Vec<String>> {
        let response: GetResponse = self
            .post(
                "get",
                json!({
                    "where": { "user_id": user_id },
                    "include": ["metadatas"],
                }),
            )
            .await
            .map_err(|e| e.into_retrieval(format!("sources of {user_id}")))?;

        Ok(sources_from_metadatas(user_id, response.metadatas))
    }
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
}

/// `query` responses carry one row per query embedding
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

#[derive(Debug, Default, Deserialize)]
struct GetResponse {
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Option<Vec<Option<Metadata>>>,
}

/// `None` when the response has no result row at all
fn passages_from_query(response: QueryResponse) -> Option<Vec<Passage>> {
    let documents = response.documents?.into_iter().next()?;
    let mut metadatas = response
        .metadatas
        .and_then(|rows| rows.into_iter().next())
        .unwrap_or_default()
        .into_iter();
    let mut distances = response
        .distances
        .and_then(|rows| rows.into_iter().next())
        .unwrap_or_default()
        .into_iter();

    let passages = documents
        .into_iter()
        .map(|document| Passage {
            content: document.unwrap_or_default(),
            metadata: metadatas.next().flatten().unwrap_or_default(),
            distance: distances.next().flatten().unwrap_or(0.0),
        })
        .collect();
    Some(passages)
}

fn passages_from_get(response: GetResponse) -> Vec<Passage> {
    let mut metadatas = response.metadatas.unwrap_or_default().into_iter();
    response
        .documents
        .unwrap_or_default()
        .into_iter()
        .map(|document| Passage {
            content: document.unwrap_or_default(),
            metadata: metadatas.next().flatten().unwrap_or_default(),
            distance: 0.0,
        })
        .collect()
}

fn sources_from_metadatas(user_id: &str, metadatas: Option<Vec<Option<Metadata>>>) -> Vec<String> {
    let sources: BTreeSet<String> = metadatas
        .unwrap_or_default()
        .iter()
        .flatten()
        .filter(|meta| meta.get("user_id").and_then(|v| v.as_str()) == Some(user_id))
        .filter_map(|meta| source_of(meta).map(ToString::to_string))
        .collect();
    sources.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_to_passages() {
        let response: QueryResponse = serde_json::from_value(json!({
            "ids": [["u_a.pdf_0", "u_a.pdf_1"]],
            "documents": [["first chunk", "second chunk"]],
            "metadatas": [[{"user_id": "u", "file_name": "a.pdf"}, null]],
            "distances": [[0.12, 0.34]],
        }))
        .unwrap();

        let passages = passages_from_query(response).unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].content, "first chunk");
        assert_eq!(passages[0].source(), Some("a.pdf"));
        assert!((passages[1].distance - 0.34).abs() < 1e-6);
        assert!(passages[1].metadata.is_empty());
    }

    #[test]
    fn test_empty_row_is_not_missing_row() {
        let response: QueryResponse =
            serde_json::from_value(json!({"documents": [[]], "distances": [[]]})).unwrap();
        assert_eq!(passages_from_query(response), Some(vec![]));

        let response: QueryResponse = serde_json::from_value(json!({"documents": []})).unwrap();
        assert_eq!(passages_from_query(response), None);
    }

    #[test]
    fn test_get_response_to_passages() {
        let response: GetResponse = serde_json::from_value(json!({
            "ids": ["x"],
            "documents": ["only chunk"],
            "metadatas": [{"user_id": "u"}],
        }))
        .unwrap();
        let passages = passages_from_get(response);
        assert_eq!(passages, vec![Passage::new("only chunk", 0.0).with_metadata("user_id", "u")]);
    }

    #[test]
    fn test_sources_are_deduplicated_per_user() {
        let metadatas: Vec<Option<Metadata>> = serde_json::from_value(json!([
            {"user_id": "u", "file_name": "b.pdf"},
            {"user_id": "u", "file_name": "a.pdf"},
            {"user_id": "u", "file_name": "a.pdf"},
            {"user_id": "u", "url": "https://example.com"},
            {"user_id": "other", "file_name": "secret.pdf"},
            {"user_id": "u"},
            null,
        ]))
        .unwrap();

        let sources = sources_from_metadatas("u", Some(metadatas));
        assert_eq!(sources, vec!["a.pdf", "b.pdf", "https://example.com"]);
    }
}
