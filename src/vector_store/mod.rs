//! Vector store gateway
//!
//! Chunks live in a vector collection with per-user metadata. The pipeline
//! only needs two reads from it: similarity search scoped to one user, and the
//! list of ingested sources for that user.

pub mod chroma;

use async_trait::async_trait;
pub use chroma::ChromaStore;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::Result;

/// Scalar metadata stored alongside a chunk (`user_id`, `file_name`, `page`, ...)
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata keys that identify where a chunk came from, in lookup order
const SOURCE_KEYS: [&str; 3] = ["source", "file_name", "url"];

/// One retrieved chunk with its similarity distance (lower is closer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub distance: f32,
}

impl Passage {
    pub fn new(content: impl Into<String>, distance: f32) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
            distance,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Source identifier of the chunk: `source`, else `file_name`, else `url`
    pub fn source(&self) -> Option<&str> {
        source_of(&self.metadata)
    }
}

pub(crate) fn source_of(metadata: &Metadata) -> Option<&str> {
    SOURCE_KEYS
        .iter()
        .filter_map(|key| metadata.get(*key).and_then(serde_json::Value::as_str))
        .find(|value| !value.is_empty())
}

/// Read access to the per-user chunk collection
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Up to `n_results` passages closest to `text`, restricted to chunks owned by `user_id`,
    /// ordered by ascending distance
    async fn query(&self, text: &str, user_id: &str, n_results: usize) -> Result<Vec<Passage>>;

    /// Distinct source identifiers of the chunks owned by `user_id`
    async fn list_sources(&self, user_id: &str) -> Result<Vec<String>>;
}
