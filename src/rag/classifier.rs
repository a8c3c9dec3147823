//! Intent classification
//!
//! Picks which response template a query should use. Classification never
//! fails: an unusable answer or a backend error both fall back to `ask`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use tracing::warn;

use super::prompts::build_classifier_prompt;
use crate::llm::GenerationClient;
use crate::llm::GenerationMode;

/// Intents the classifier may return
pub const CANDIDATE_INTENTS: [&str; 7] = [
    "ask",
    "summary",
    "testcase_excel",
    "test_case",
    "validate",
    "test_strategy",
    "risk",
];

/// Intent used whenever classification cannot produce one
pub const DEFAULT_INTENT: &str = "ask";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The model answered with something outside the candidate set
    Invalid,
    /// The generation call failed
    Failed,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => f.write_str("invalid intent"),
            Self::Failed => f.write_str("classifier failure"),
        }
    }
}

/// Result of classifying a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Intent(String),
    Fallback(FallbackReason),
}

impl Classification {
    /// Intent string to resolve against the template registry
    pub fn intent(&self) -> &str {
        match self {
            Self::Intent(intent) => intent,
            Self::Fallback(_) => DEFAULT_INTENT,
        }
    }
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, query: &str, context: &str) -> Classification;
}

/// Classifier that asks the generation backend for a single action token
pub struct LlmActionClassifier {
    client: Arc<dyn GenerationClient>,
    mode: GenerationMode,
}

impl LlmActionClassifier {
    pub fn new(client: Arc<dyn GenerationClient>, mode: GenerationMode) -> Self {
        Self { client, mode }
    }
}

#[async_trait]
impl IntentClassifier for LlmActionClassifier {
    async fn classify(&self, query: &str, context: &str) -> Classification {
        let prompt = build_classifier_prompt(query, context);
        match self.client.complete(&prompt, self.mode).await {
            Ok(raw) => {
                let intent = raw.trim().to_lowercase();
                if CANDIDATE_INTENTS.contains(&intent.as_str()) {
                    debug!("Classified query as '{}'", intent);
                    Classification::Intent(intent)
                } else {
                    warn!("Classifier returned unknown action '{}', using ask", intent);
                    Classification::Fallback(FallbackReason::Invalid)
                }
            }
            Err(e) => {
                warn!("Action classification failed: {}, using ask", e);
                Classification::Fallback(FallbackReason::Failed)
            }
        }
    }
}
