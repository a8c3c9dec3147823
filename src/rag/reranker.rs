//! Cross-encoder re-ranking
//!
//! Re-ranking is best effort. When the scorer is unavailable or fails, the
//! caller receives the documents in their original order.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::RerankerConfig;
use crate::errors::NexqaError;
use crate::errors::Result;

/// Most documents a ranked outcome keeps
pub const RERANK_TOP_N: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RerankOutcome {
    /// At most [`RERANK_TOP_N`] documents, most relevant first
    Ranked(Vec<String>),
    /// Input returned unchanged
    Passthrough { documents: Vec<String>, reason: String },
}

impl RerankOutcome {
    pub fn documents(&self) -> &[String] {
        match self {
            Self::Ranked(documents) | Self::Passthrough { documents, .. } => documents,
        }
    }

    pub fn into_documents(self) -> Vec<String> {
        match self {
            Self::Ranked(documents) | Self::Passthrough { documents, .. } => documents,
        }
    }
}

#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, documents: Vec<String>) -> RerankOutcome;
}

/// Reranker used when no scoring endpoint is configured
pub struct DisabledReranker;

#[async_trait]
impl Reranker for DisabledReranker {
    async fn rerank(&self, _query: &str, documents: Vec<String>) -> RerankOutcome {
        RerankOutcome::Passthrough {
            documents,
            reason: "reranker unavailable".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
    raw_scores: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ScoredIndex {
    index: usize,
    score: f32,
}

/// Cross-encoder served over HTTP (`POST {endpoint}/rerank`)
pub struct CrossEncoderReranker {
    client: Client,
    endpoint: String,
    model: String,
}

impl CrossEncoderReranker {
    pub fn new(endpoint: &str, config: &RerankerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| NexqaError::Http(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<ScoredIndex>> {
        let url = format!("{}/rerank", self.endpoint);
        debug!("Scoring {} documents with {} at {}", documents.len(), self.model, url);

        let response = self
            .client
            .post(&url)
            .json(&RerankRequest {
                query,
                texts: documents,
                raw_scores: false,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NexqaError::Http(format!("rerank failed ({status}): {body}")));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Reranker for CrossEncoderReranker {
    async fn rerank(&self, query: &str, documents: Vec<String>) -> RerankOutcome {
        let scores = match self.score(query, &documents).await {
            Ok(scores) => scores,
            Err(e) => {
                return RerankOutcome::Passthrough {
                    documents,
                    reason: e.to_string(),
                };
            }
        };

        match order_by_score(&documents, scores) {
            Ok(ranked) => RerankOutcome::Ranked(ranked),
            Err(reason) => RerankOutcome::Passthrough { documents, reason },
        }
    }
}

/// Map scored indices back onto `documents`, best first, truncated to [`RERANK_TOP_N`]
fn order_by_score(
    documents: &[String],
    mut scores: Vec<ScoredIndex>,
) -> std::result::Result<Vec<String>, String> {
    if scores.is_empty() {
        return Err("reranker returned no scores".to_string());
    }
    if let Some(bad) = scores.iter().find(|s| s.index >= documents.len()) {
        return Err(format!(
            "reranker returned index {} for {} documents",
            bad.index,
            documents.len()
        ));
    }

    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(scores
        .into_iter()
        .take(RERANK_TOP_N)
        .map(|s| documents[s.index].clone())
        .collect())
}
