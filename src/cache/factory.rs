// ABOUTME: Cache factory for configuration-based backend selection
// ABOUTME: Dispatches to the Redis or in-memory provider behind one type
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{memory::InMemoryCache, redis::RedisCache, CacheConfig, CacheKey, CacheProvider};
use crate::errors::AppResult;

/// Unified cache handle over the configured backend
#[derive(Clone)]
pub enum Cache {
    /// In-memory backend (tests, local mode)
    Memory(InMemoryCache),
    /// Redis backend
    Redis(RedisCache),
}

impl Cache {
    /// Create a cache instance for the configured backend
    ///
    /// # Errors
    ///
    /// Returns an error if backend initialization fails
    pub async fn new(config: CacheConfig) -> AppResult<Self> {
        if config.use_memory {
            info!("initializing in-memory cache backend");
            Ok(Self::Memory(InMemoryCache::new(config).await?))
        } else {
            info!(addr = %config.addr, "initializing redis cache backend");
            Ok(Self::Redis(RedisCache::new(config).await?))
        }
    }

    /// Store a value; `ttl` of `None` means no expiry
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or storage fails
    pub async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> AppResult<()> {
        match self {
            Self::Memory(cache) => cache.set(key, value, ttl).await,
            Self::Redis(cache) => cache.set(key, value, ttl).await,
        }
    }

    /// Retrieve a value; `Ok(None)` on a miss
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or deserialization fails
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        match self {
            Self::Memory(cache) => cache.get(key).await,
            Self::Redis(cache) => cache.get(key).await,
        }
    }

    /// Remove a single entry
    ///
    /// # Errors
    ///
    /// Returns an error if invalidation fails
    pub async fn invalidate(&self, key: &CacheKey) -> AppResult<()> {
        match self {
            Self::Memory(cache) => cache.invalidate(key).await,
            Self::Redis(cache) => cache.invalidate(key).await,
        }
    }

    /// Verify the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the health check fails
    pub async fn health_check(&self) -> AppResult<()> {
        match self {
            Self::Memory(cache) => cache.health_check().await,
            Self::Redis(cache) => cache.health_check().await,
        }
    }

    /// Release the backend connection; safe to call more than once
    ///
    /// # Errors
    ///
    /// Returns an error only for failures other than "already closed"
    pub async fn close(&self) -> AppResult<()> {
        match self {
            Self::Memory(cache) => cache.close().await,
            Self::Redis(cache) => cache.close().await,
        }
    }
}
