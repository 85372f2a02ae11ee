// ABOUTME: In-memory cache implementation with LRU eviction and TTL support
// ABOUTME: Backend for tests and local mode where no Redis is available
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{CacheConfig, CacheKey, CacheProvider};
use crate::errors::{AppError, AppResult};

/// In-memory cache entry with optional expiration
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(data: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            data,
            expires_at: ttl.map(|t| Instant::now() + t),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-memory cache with LRU eviction and lazy expiry.
///
/// Expired entries are dropped when read; LRU eviction bounds memory in
/// between. There is no connection to lose, so health checks and close are
/// trivial.
#[derive(Clone)]
pub struct InMemoryCache {
    store: Arc<RwLock<LruCache<String, CacheEntry>>>,
}

impl InMemoryCache {
    /// Fallback capacity when configuration specifies zero entries
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
        Some(n) => n,
        None => unreachable!(),
    };
}

#[async_trait::async_trait]
impl CacheProvider for InMemoryCache {
    async fn new(config: CacheConfig) -> AppResult<Self> {
        let capacity =
            NonZeroUsize::new(config.memory_capacity).unwrap_or(Self::DEFAULT_CAPACITY);
        Ok(Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
        })
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> AppResult<()> {
        let data = serde_json::to_vec(value)
            .map_err(|e| AppError::internal(format!("cache serialization failed: {e}")))?;
        self.store
            .write()
            .await
            .put(key.to_string(), CacheEntry::new(data, ttl));
        Ok(())
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let key = key.to_string();
        let mut store = self.store.write().await;

        let live = match store.get(&key) {
            None => return Ok(None),
            Some(entry) if entry.is_expired() => None,
            Some(entry) => Some(entry.data.clone()),
        };

        let Some(bytes) = live else {
            store.pop(&key);
            return Ok(None);
        };
        drop(store);

        let value = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::internal(format!("cache deserialization failed: {e}")))?;
        Ok(Some(value))
    }

    async fn invalidate(&self, key: &CacheKey) -> AppResult<()> {
        self.store.write().await.pop(&key.to_string());
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        self.store.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CacheConfig {
        CacheConfig {
            use_memory: true,
            ..CacheConfig::default()
        }
    }

    #[tokio::test]
    async fn set_get_round_trip() {
        let cache = InMemoryCache::new(test_config()).await.unwrap();
        let key = CacheKey::App { app_id: 1 };

        cache.set(&key, &"hello".to_owned(), None).await.unwrap();
        let got: Option<String> = cache.get(&key).await.unwrap();
        assert_eq!(got.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn miss_is_none_not_error() {
        let cache = InMemoryCache::new(test_config()).await.unwrap();
        let got: Option<String> = cache
            .get(&CacheKey::App { app_id: 9 })
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = InMemoryCache::new(test_config()).await.unwrap();
        let key = CacheKey::App { app_id: 1 };

        cache
            .set(&key, &1_u32, Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let got: Option<u32> = cache.get(&key).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn invalidate_drops_the_entry() {
        let cache = InMemoryCache::new(test_config()).await.unwrap();
        let key = CacheKey::App { app_id: 1 };

        cache.set(&key, &"hello".to_owned(), None).await.unwrap();
        cache.invalidate(&key).await.unwrap();
        let got: Option<String> = cache.get(&key).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn health_check_always_passes() {
        let cache = InMemoryCache::new(test_config()).await.unwrap();
        cache.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let cache = InMemoryCache::new(test_config()).await.unwrap();
        cache.close().await.unwrap();
        cache.close().await.unwrap();
    }
}
