//! # Answer Cache
//!
//! A bounded, in-memory key/value store with a fixed time-to-live.
//!
//! ## Behaviour
//!
//! - **Lazy TTL expiry**: every read and write first sweeps out entries older
//!   than the configured TTL; a lookup never returns an expired value.
//! - **Capacity bound**: when an insert grows the store past `max_entries`,
//!   the entry with the oldest insertion timestamp is dropped.
//! - **Shared use**: the map is guarded by an async lock, so one cache can be
//!   wrapped in an `Arc` and shared by concurrent requests.
//!
//! ## Example
//!
//! ```rust
//! use ragdesk_cache::cache::{CacheConfig, TtlCache};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let config = CacheConfig::builder()
//!     .ttl(Duration::from_secs(600))
//!     .max_entries(128)
//!     .build();
//!
//! let cache = TtlCache::new(config);
//! cache.set("default:what is tcp", "cached answer".to_string()).await;
//!
//! if let Some(value) = cache.get("default:what is tcp").await {
//!     println!("Cache hit: {}", value);
//! }
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use entry::{CacheEntry, CacheMetadata};
pub use store::TtlCache;
pub use types::{CacheKey, CacheStats};
