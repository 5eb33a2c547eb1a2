//! Configuration for the cache system

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`TtlCache`](crate::cache::TtlCache)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum age of an entry before it is treated as absent
    pub ttl: Duration,

    /// Maximum number of live entries; the oldest insertion is dropped beyond it
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            // 10 minutes
            ttl: Duration::from_secs(600),
            max_entries: 128,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::Config(
                "max_entries must be greater than 0".to_string(),
            ));
        }

        if self.ttl.is_zero() {
            return Err(CacheError::Config("ttl must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    ttl: Option<Duration>,
    max_entries: Option<usize>,
}

impl CacheConfigBuilder {
    /// Set the time-to-live for cache entries
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the time-to-live in whole seconds
    pub fn ttl_secs(self, secs: u64) -> Self {
        self.ttl(Duration::from_secs(secs))
    }

    /// Set maximum number of cache entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            ttl: self.ttl.unwrap_or(defaults.ttl),
            max_entries: self.max_entries.unwrap_or(defaults.max_entries),
        }
    }
}
