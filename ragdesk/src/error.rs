//! Error types for the answer pipeline
//!
//! Every failure reaches the immediate caller as a typed error; the pipeline
//! itself never retries.

use thiserror::Error;

/// Main error type for ragdesk operations
#[derive(Error, Debug)]
pub enum RagError {
    /// Required credentials or parameters are missing or inconsistent at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The vector index is unreachable or rejected the query
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// The language model call failed (auth, rate limit, timeout, malformed output)
    #[error("Generation error: {0}")]
    Generation(String),

    /// The request was rejected before any retrieval or generation work
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    /// True when the caller, not an upstream service, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, RagError::Validation(_))
    }
}

/// Result type alias for ragdesk operations
pub type Result<T> = std::result::Result<T, RagError>;

impl From<ragdesk_cache::CacheError> for RagError {
    fn from(e: ragdesk_cache::CacheError) -> Self {
        RagError::Configuration(e.to_string())
    }
}
