//! In-memory cache implementation using moka
//!
//! Values are stored as JSON strings so any serializable type fits. Every
//! entry shares the TTL the cache was built with.

use anyhow::{Context, Result};
use moka::future::Cache;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Cache entry wrapper that stores serialized JSON data
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

/// In-process cache for rendered public reads
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
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self { cache, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// `Ok(None)` when the key is absent or expired
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(entry) => Ok(Some(entry.deserialize()?)),
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let entry = CacheEntry::new(value)?;
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    pub async fn delete(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    /// Drop every key starting with `prefix`
    pub async fn delete_prefix(&self, prefix: &str) {
        let keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| (*key).clone())
            .collect();

        for key in keys {
            self.cache.invalidate(&key).await;
        }
    }

    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn cache() -> MemoryCache {
        MemoryCache::new(100, Duration::from_secs(60))
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Card {
        title: String,
        tags: Vec<String>,
    }

    #[tokio::test]
    async fn test_set_and_get_struct() {
        let cache = cache();
        let card = Card {
            title: "Folio".into(),
            tags: vec!["rust".into()],
        };
        cache.set("projects:folio", &card).await.unwrap();

        let loaded: Option<Card> = cache.get("projects:folio").await.unwrap();
        assert_eq!(loaded, Some(card));

        let missing: Option<Card> = cache.get("projects:none").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_prefix_only_touches_matching_keys() {
        let cache = cache();
        cache.set("articles:list:1", &1).await.unwrap();
        cache.set("articles:slug:a", &2).await.unwrap();
        cache.set("projects:list", &3).await.unwrap();

        cache.delete_prefix("articles:").await;

        assert_eq!(cache.get::<i32>("articles:list:1").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("articles:slug:a").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("projects:list").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache = cache();
        cache.set("a", &"x").await.unwrap();
        cache.set("b", &"y").await.unwrap();

        cache.delete("a").await;
        assert_eq!(cache.get::<String>("a").await.unwrap(), None);

        cache.clear().await;
        assert_eq!(cache.get::<String>("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = MemoryCache::new(10, Duration::from_millis(20));
        cache.set("short", &"lived").await.unwrap();
        assert!(cache.get::<String>("short").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        cache.cache.run_pending_tasks().await;
        assert!(cache.get::<String>("short").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_type_mismatch_is_an_error() {
        let cache = cache();
        cache.set("n", &"not a number").await.unwrap();
        assert!(cache.get::<i64>("n").await.is_err());
    }
}
