//! Error types for the answer cache

use thiserror::Error;

/// Errors raised while configuring a cache
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Invalid cache configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
