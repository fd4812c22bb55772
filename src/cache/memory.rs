//! In-memory cache implementation using moka
//!
//! Thread-safe cache with TTL expiration and glob-style pattern invalidation.
//! Entries share one TTL configured at construction; public read paths are
//! short-lived enough that per-entry TTLs are not worth the machinery.

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default maximum cache capacity (number of entries)
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Default TTL for cache entries (5 minutes)
const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// JSON-serialized cache entry
#[derive(Clone)]
struct CacheEntry {
    data: Arc<String>,
}

impl CacheEntry {
    fn new<T: Serialize>(value: &T) -> Result<Self> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        Ok(Self {
            data: Arc::new(json),
        })
    }

    fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.data).context("Failed to deserialize cache value")
    }
}

/// In-memory cache using moka
pub struct MemoryCache {
    cache: Cache<String, CacheEntry>,
    ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl MemoryCache {
    /// Create a new memory cache with default settings
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(DEFAULT_MAX_CAPACITY, DEFAULT_TTL)
    }

    /// Create a new memory cache with custom capacity and TTL
    pub fn with_capacity_and_ttl(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();

        Self { cache, ttl }
    }

    /// TTL applied to every entry
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current number of entries
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Glob-style match: `*` matches any run of characters, `?` exactly one.
    fn pattern_matches(pattern: &str, key: &str) -> bool {
        fn matches(pattern: &[char], key: &[char]) -> bool {
            match (pattern.first(), key.first()) {
                (None, None) => true,
                (Some('*'), _) => {
                    matches(&pattern[1..], key)
                        || (!key.is_empty() && matches(pattern, &key[1..]))
                }
                (Some('?'), Some(_)) => matches(&pattern[1..], &key[1..]),
                (Some(p), Some(k)) if p == k => matches(&pattern[1..], &key[1..]),
                _ => false,
            }
        }

        let pattern: Vec<char> = pattern.chars().collect();
        let key: Vec<char> = key.chars().collect();
        matches(&pattern, &key)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(entry) => Ok(Some(entry.deserialize()?)),
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let entry = CacheEntry::new(value)?;
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let pattern = pattern.to_string();
        self.cache
            .invalidate_entries_if(move |key, _| Self::pattern_matches(&pattern, key))
            .map_err(|e| anyhow::anyhow!("Failed to invalidate cache entries: {}", e))?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();

        cache.set("greeting", &"hello".to_string()).await.unwrap();
        let value: Option<String> = cache.get("greeting").await.unwrap();
        assert_eq!(value, Some("hello".to_string()));

        let missing: Option<String> = cache.get("nothing").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_structured_values() {
        let cache = MemoryCache::new();

        let value = vec![1i64, 2, 3];
        cache.set("numbers", &value).await.unwrap();
        let loaded: Option<Vec<i64>> = cache.get("numbers").await.unwrap();
        assert_eq!(loaded, Some(value));
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MemoryCache::new();

        cache.set("gone", &1i64).await.unwrap();
        cache.delete("gone").await.unwrap();
        let value: Option<i64> = cache.get("gone").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_delete_pattern() {
        let cache = MemoryCache::new();

        cache.set("blog:list:1", &1i64).await.unwrap();
        cache.set("blog:list:2", &2i64).await.unwrap();
        cache.set("promo:active", &3i64).await.unwrap();

        cache.delete_pattern("blog:*").await.unwrap();
        // invalidate_entries_if is lazy; reads observe the invalidation
        let a: Option<i64> = cache.get("blog:list:1").await.unwrap();
        let b: Option<i64> = cache.get("blog:list:2").await.unwrap();
        let c: Option<i64> = cache.get("promo:active").await.unwrap();
        assert!(a.is_none());
        assert!(b.is_none());
        assert_eq!(c, Some(3));
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let cache = MemoryCache::with_capacity_and_ttl(100, Duration::from_millis(50));

        cache.set("ephemeral", &1i64).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        let value: Option<i64> = cache.get("ephemeral").await.unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_pattern_matching() {
        assert!(MemoryCache::pattern_matches("blog:*", "blog:list:1"));
        assert!(MemoryCache::pattern_matches("*", "anything"));
        assert!(MemoryCache::pattern_matches("user:?", "user:1"));
        assert!(!MemoryCache::pattern_matches("user:?", "user:12"));
        assert!(!MemoryCache::pattern_matches("blog:*", "promo:active"));
        assert!(MemoryCache::pattern_matches("exact", "exact"));
        assert!(!MemoryCache::pattern_matches("exact", "exactly"));
    }
}
