use thiserror::Error;

#[derive(Error, Debug)]
pub enum NexqaError {
    #[error("Retrieval failed for query '{query}': {message}")]
    Retrieval { query: String, message: String },

    #[error("Generation failed: {message}")]
    Generation {
        /// Template the generation was attempted with, when known
        action: Option<String>,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

impl NexqaError {
    pub fn retrieval(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Retrieval {
            query: query.into(),
            message: message.into(),
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            action: None,
            message: message.into(),
        }
    }

    /// Attach the attempted template to a generation failure. Other variants pass through.
    #[must_use]
    pub fn with_action(self, action: impl Into<String>) -> Self {
        match self {
            Self::Generation { message, .. } => Self::Generation {
                action: Some(action.into()),
                message,
            },
            other => other,
        }
    }

    /// Reclassify any failure raised while generating as a generation failure for `action`
    #[must_use]
    pub fn into_generation(self, action: impl Into<String>) -> Self {
        match self {
            Self::Generation { message, .. } => Self::Generation {
                action: Some(action.into()),
                message,
            },
            other => Self::Generation {
                action: Some(action.into()),
                message: other.to_string(),
            },
        }
    }

    /// Reclassify any failure raised while retrieving as a retrieval failure for `query`
    #[must_use]
    pub fn into_retrieval(self, query: impl Into<String>) -> Self {
        match self {
            Self::Retrieval { .. } => self,
            other => Self::Retrieval {
                query: query.into(),
                message: other.to_string(),
            },
        }
    }

    /// Query attached to a retrieval failure
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Retrieval { query, .. } => Some(query),
            _ => None,
        }
    }

    /// Template attached to a generation failure
    pub fn action(&self) -> Option<&str> {
        match self {
            Self::Generation { action, .. } => action.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for NexqaError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NexqaError>;
