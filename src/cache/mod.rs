// ABOUTME: Cache abstraction layer for user and application record caching
// ABOUTME: Pluggable backend support (in-memory, Redis) behind one provider trait
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

pub mod factory;
pub mod memory;
pub mod redis;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::cache::{APP_KEY_PREFIX, USER_KEY_PREFIX};
use crate::errors::AppResult;

/// Cache provider trait for pluggable backend implementations.
///
/// A miss is `Ok(None)`; backends reserve `Err` for transport and
/// serialization failures. Callers above the façade never observe a miss
/// directly: it degrades to the durable store.
#[async_trait::async_trait]
pub trait CacheProvider: Send + Sync + Clone {
    /// Create new cache instance with configuration
    ///
    /// # Errors
    ///
    /// Returns an error if cache initialization fails
    async fn new(config: CacheConfig) -> AppResult<Self>
    where
        Self: Sized;

    /// Store a value; `ttl` of `None` means no expiry
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or storage fails
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> AppResult<()>;

    /// Retrieve a value; `Ok(None)` on a miss
    ///
    /// # Errors
    ///
    /// Returns an error if the backend or deserialization fails
    async fn get<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> AppResult<Option<T>>;

    /// Remove a single entry
    ///
    /// # Errors
    ///
    /// Returns an error if invalidation fails
    async fn invalidate(&self, key: &CacheKey) -> AppResult<()>;

    /// Verify the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the health check fails
    async fn health_check(&self) -> AppResult<()>;

    /// Release the backend connection; safe to call more than once
    ///
    /// # Errors
    ///
    /// Returns an error only for failures other than "already closed"
    async fn close(&self) -> AppResult<()>;
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Use the in-memory backend instead of Redis
    pub use_memory: bool,
    /// Redis address, `host:port`
    pub addr: String,
    /// Redis ACL username
    pub username: Option<String>,
    /// Redis password
    pub password: Option<String>,
    /// Redis logical database
    pub db: i64,
    /// Connection attempts before startup fails
    pub max_retries: u32,
    /// Per-attempt dial timeout
    pub dial_timeout: Duration,
    /// Per-operation timeout
    pub timeout: Duration,
    /// TTL applied to cached user records
    pub token_ttl: Duration,
    /// Capacity of the in-memory backend
    pub memory_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        use crate::constants::{cache, ttl};
        Self {
            use_memory: false,
            addr: "127.0.0.1:6379".to_owned(),
            username: None,
            password: None,
            db: 0,
            max_retries: cache::DEFAULT_MAX_RETRIES,
            dial_timeout: Duration::from_secs(cache::DEFAULT_DIAL_TIMEOUT_SECS),
            timeout: Duration::from_secs(cache::DEFAULT_TIMEOUT_SECS),
            token_ttl: Duration::from_secs(ttl::DEFAULT_TOKEN_TTL_SECS),
            memory_capacity: cache::DEFAULT_MEMORY_CAPACITY,
        }
    }
}

/// Structured cache key with per-application isolation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A user record, keyed by application and username
    User {
        /// Application the record was cached for
        app_id: u32,
        /// Case-sensitive username
        username: String,
    },
    /// An application record
    App {
        /// Application identifier
        app_id: u32,
    },
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User { app_id, username } => {
                write!(f, "{USER_KEY_PREFIX}:{app_id}:{username}")
            }
            Self::App { app_id } => write!(f, "{APP_KEY_PREFIX}:{app_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout_is_stable() {
        let user = CacheKey::User {
            app_id: 1,
            username: "alice".into(),
        };
        assert_eq!(user.to_string(), "users:1:alice");
        assert_eq!(CacheKey::App { app_id: 42 }.to_string(), "apps:42");
    }
}
