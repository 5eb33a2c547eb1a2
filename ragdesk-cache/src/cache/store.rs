//! Cache store with lazy TTL expiry and oldest-first capacity eviction

use crate::cache::{
    config::CacheConfig,
    entry::CacheEntry,
    types::{CacheKey, CacheStats},
};
use crate::error::Result;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Bounded key/value cache with a fixed time-to-live.
///
/// - Every `get` and `set` first sweeps out all expired entries.
/// - When an insert pushes the store past `max_entries`, the entry with the
///   oldest insertion timestamp is dropped.
/// - The entry map sits behind a single lock, so each read-evict-lookup and
///   write-evict-insert-evict sequence is atomic with respect to other tasks.
///   Two tasks racing on the same key still resolve as last-write-wins.
pub struct TtlCache<V> {
    config: CacheConfig,
    store: RwLock<CacheStore<V>>,
}

/// Internal cache storage
struct CacheStore<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,

    /// Next insertion sequence number
    next_sequence: u64,

    stats: CacheStats,
}

impl<V> CacheStore<V> {
    /// Remove every entry older than `ttl`, returning how many went
    fn purge_expired(&mut self, config: &CacheConfig) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(config.ttl));
        let purged = before - self.entries.len();

        if purged > 0 {
            self.stats.evictions_ttl += purged as u64;
            debug!(purged, "Purged expired cache entries");
        }
        purged
    }

    /// Drop the single oldest entry by insertion time
    fn evict_oldest(&mut self) -> Option<CacheKey> {
        let oldest = self
            .entries
            .values()
            .min_by_key(|entry| entry.eviction_rank())
            .map(|entry| entry.key.clone())?;

        self.entries.remove(&oldest);
        self.stats.evictions_capacity += 1;
        Some(oldest)
    }
}

impl<V: Clone> TtlCache<V> {
    /// Create a new cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        info!(
            ttl_secs = config.ttl.as_secs_f64(),
            max_entries = config.max_entries,
            "Initializing answer cache"
        );

        Self {
            config,
            store: RwLock::new(CacheStore {
                entries: HashMap::new(),
                next_sequence: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    /// Create a cache after validating its configuration
    pub fn try_new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Look up `key`, treating anything older than the TTL as absent
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut store = self.store.write().await;
        store.purge_expired(&self.config);

        let expired = store
            .entries
            .get(key)
            .map(|entry| entry.is_expired(self.config.ttl));

        let Some(expired) = expired else {
            debug!(key, "Cache miss");
            store.stats.misses += 1;
            return None;
        };

        // The sweep and the lookup read the clock separately
        if expired {
            debug!(key, "Cache entry expired on lookup");
            store.entries.remove(key);
            store.stats.evictions_ttl += 1;
            store.stats.misses += 1;
            return None;
        }

        store.stats.hits += 1;
        let entry = store.entries.get_mut(key)?;
        entry.mark_accessed();
        debug!(key, "Cache hit");
        Some(entry.value.clone())
    }

    /// Insert or overwrite `key`, stamping it with the current time
    pub async fn set(&self, key: impl Into<CacheKey>, value: V) {
        let key = key.into();
        let mut store = self.store.write().await;
        store.purge_expired(&self.config);

        let sequence = store.next_sequence;
        store.next_sequence += 1;

        debug!(key = %key, "Storing cache entry");
        store
            .entries
            .insert(key.clone(), CacheEntry::new(key, value, sequence));

        if store.entries.len() > self.config.max_entries {
            if let Some(evicted) = store.evict_oldest() {
                debug!(key = %evicted, "Evicted oldest cache entry");
            }
        }
    }

    /// Remove a specific entry from the cache
    pub async fn remove(&self, key: &str) -> Option<V> {
        let mut store = self.store.write().await;
        store.entries.remove(key).map(|entry| entry.value)
    }

    /// Check if a key is present, without expiring anything
    pub async fn contains_key(&self, key: &str) -> bool {
        let store = self.store.read().await;
        store.entries.contains_key(key)
    }

    /// Clear all entries from the cache
    pub async fn clear(&self) {
        let mut store = self.store.write().await;
        let count = store.entries.len();
        store.entries.clear();
        info!("Cleared {} entries from cache", count);
    }

    /// Snapshot of the cache counters
    pub async fn stats(&self) -> CacheStats {
        let store = self.store.read().await;
        CacheStats {
            entries: store.entries.len(),
            ..store.stats
        }
    }

    /// Number of stored entries, including any not yet swept
    pub async fn len(&self) -> usize {
        self.store.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.entries.is_empty()
    }
}
