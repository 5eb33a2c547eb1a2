//! Cache entry with insertion timestamp

use crate::cache::types::CacheKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached value together with the bookkeeping needed for expiry and eviction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// The cache key
    pub key: CacheKey,

    /// The cached value
    pub value: V,

    /// Entry metadata
    pub metadata: CacheMetadata,
}

impl<V> CacheEntry<V> {
    /// Create an entry stamped with the current time.
    ///
    /// `sequence` is a store-wide monotonic counter; it orders entries whose
    /// timestamps compare equal.
    pub fn new(key: CacheKey, value: V, sequence: u64) -> Self {
        Self {
            key,
            value,
            metadata: CacheMetadata {
                inserted_at: Utc::now(),
                sequence,
                access_count: 0,
            },
        }
    }

    /// Time elapsed since insertion
    pub fn age(&self) -> Duration {
        (Utc::now() - self.metadata.inserted_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// An entry is expired once its age strictly exceeds the TTL
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }

    pub fn mark_accessed(&mut self) {
        self.metadata.access_count += 1;
    }

    /// Ordering key for capacity eviction: oldest insertion first
    pub(crate) fn eviction_rank(&self) -> (DateTime<Utc>, u64) {
        (self.metadata.inserted_at, self.metadata.sequence)
    }
}

/// Metadata associated with a cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// When the entry was (re)inserted
    pub inserted_at: DateTime<Utc>,

    /// Insertion order within the owning store
    pub sequence: u64,

    /// Number of cache hits served by this entry
    pub access_count: u64,
}
