//! Integration tests for the cache module
//!
//! These tests verify:
//! - TTL expiry triggered by the read itself
//! - Capacity eviction of the least recently inserted key
//! - Structured values
//! - Concurrent access from many tasks

use ragdesk_cache::{CacheConfig, TtlCache};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
struct Answer {
    text: String,
    sources: Vec<String>,
}

#[tokio::test]
async fn test_structured_values_round_trip() {
    let cache = TtlCache::new(CacheConfig::default());

    let answer = Answer {
        text: "TCP uses a three-way handshake".to_string(),
        sources: vec!["networking-pdf".to_string()],
    };
    cache.set("networking-pdf:tcp", answer.clone()).await;

    assert_eq!(cache.get("networking-pdf:tcp").await, Some(answer));
}

#[tokio::test]
async fn test_ttl_expiration() {
    let config = CacheConfig::builder()
        .ttl(Duration::from_millis(100))
        .build();

    let cache = TtlCache::new(config);

    cache
        .set("expiring_key", "expiring_value".to_string())
        .await;

    // Should be available immediately
    assert!(cache.get("expiring_key").await.is_some());

    tokio::time::sleep(Duration::from_millis(150)).await;

    // Should be expired now
    assert!(cache.get("expiring_key").await.is_none());

    let stats = cache.stats().await;
    assert!(stats.evictions_ttl > 0);
}

#[tokio::test]
async fn test_capacity_n_plus_one() {
    let max = 5;
    let config = CacheConfig::builder()
        .ttl(Duration::from_secs(300))
        .max_entries(max)
        .build();

    let cache = TtlCache::new(config);

    // Insert in an order that differs from lexicographic order
    let keys = ["zeta", "alpha", "mu", "beta", "omega", "delta"];
    for key in keys {
        cache.set(key, key.to_uppercase()).await;
    }

    assert_eq!(cache.len().await, max);
    assert!(!cache.contains_key("zeta").await);
    for key in &keys[1..] {
        assert!(cache.contains_key(key).await, "{} should remain", key);
    }
}

#[tokio::test]
async fn test_expired_entries_do_not_count_toward_capacity() {
    let config = CacheConfig::builder()
        .ttl(Duration::from_millis(50))
        .max_entries(2)
        .build();

    let cache = TtlCache::new(config);
    cache.set("old1", 1).await;
    cache.set("old2", 2).await;

    tokio::time::sleep(Duration::from_millis(100)).await;

    cache.set("new1", 3).await;
    cache.set("new2", 4).await;

    assert_eq!(cache.get("new1").await, Some(3));
    assert_eq!(cache.get("new2").await, Some(4));

    let stats = cache.stats().await;
    assert_eq!(stats.evictions_capacity, 0);
    assert_eq!(stats.evictions_ttl, 2);
}

#[tokio::test]
async fn test_concurrent_access() {
    let config = CacheConfig::builder().max_entries(1000).build();
    let cache = Arc::new(TtlCache::new(config));

    let mut handles = vec![];
    for i in 0..10 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            for j in 0..10 {
                let key = format!("key_{}_{}", i, j);
                cache.set(key.clone(), j).await;
                assert_eq!(cache.get(&key).await, Some(j));
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(cache.len().await, 100);
    assert_eq!(cache.stats().await.hits, 100);
}

#[tokio::test]
async fn test_same_key_last_write_wins() {
    let cache = Arc::new(TtlCache::new(CacheConfig::default()));

    let first = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.set("default:q", "answer".to_string()).await })
    };
    let second = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.set("default:q", "answer".to_string()).await })
    };
    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(cache.len().await, 1);
    assert_eq!(cache.get("default:q").await, Some("answer".to_string()));
}
