//! # ragdesk-cache
//!
//! Bounded in-memory TTL cache used by the ragdesk answer pipeline to
//! short-circuit repeated questions.
//!
//! ```no_run
//! use ragdesk_cache::{CacheConfig, TtlCache};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache: TtlCache<String> = TtlCache::new(CacheConfig::default());
//!     cache.set("networking:what is a subnet", "A subnet is ...".to_string()).await;
//!     assert!(cache.get("networking:what is a subnet").await.is_some());
//! }
//! ```

pub mod cache;
pub mod error;

// Re-export main types for convenience
pub use cache::{CacheConfig, CacheConfigBuilder, CacheEntry, CacheKey, CacheStats, TtlCache};
pub use error::{CacheError, Result};
