// ABOUTME: Redis cache implementation with bounded connect retry and self-healing reconnect
// ABOUTME: Every operation pings first and replaces the client under a writer lock on failure
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{CacheConfig, CacheKey, CacheProvider};
use crate::constants::cache::RETRY_DELAY_SECS;
use crate::errors::{AppError, AppResult};

/// Redis cache with a self-healing connection.
///
/// The client slot is guarded by a reader/writer lock. Operations clone the
/// manager under the reader lock and never hold the lock across network I/O;
/// reconnection briefly takes the writer lock to swap the client. Startup
/// retries are bounded by `max_retries * dial_timeout`.
#[derive(Clone)]
pub struct RedisCache {
    config: CacheConfig,
    client: Arc<RwLock<Option<ConnectionManager>>>,
}

impl RedisCache {
    /// Parse `host:port` and assemble connection parameters
    fn connection_info(&self) -> AppResult<ConnectionInfo> {
        let (host, port) = self
            .config
            .addr
            .rsplit_once(':')
            .ok_or_else(|| AppError::config(format!("invalid redis addr: {}", self.config.addr)))?;
        let port: u16 = port
            .parse()
            .map_err(|_| AppError::config(format!("invalid redis port: {port}")))?;

        Ok(ConnectionInfo {
            addr: ConnectionAddr::Tcp(host.to_owned(), port),
            redis: RedisConnectionInfo {
                db: self.config.db,
                username: self.config.username.clone(),
                password: self.config.password.clone(),
                ..RedisConnectionInfo::default()
            },
        })
    }

    /// Open a fresh connection and verify it with a ping
    async fn connect_once(&self) -> AppResult<ConnectionManager> {
        let client = redis::Client::open(self.connection_info()?)
            .map_err(|e| AppError::internal(format!("failed to create redis client: {e}")))?;

        let mut manager = timeout(self.config.dial_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| AppError::internal("redis dial timed out"))?
            .map_err(|e| AppError::internal(format!("failed to connect to redis: {e}")))?;

        ping(&mut manager, self.config.timeout).await?;
        Ok(manager)
    }

    /// Bounded retry loop; the delay between attempts is fixed
    async fn connect_with_retry(&self) -> AppResult<ConnectionManager> {
        let mut last_err = AppError::internal("no connection attempts made");
        for attempt in 1..=self.config.max_retries {
            match self.connect_once().await {
                Ok(manager) => {
                    debug!(attempt, addr = %self.config.addr, "redis connection established");
                    return Ok(manager);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max = self.config.max_retries,
                        error = %e,
                        "failed to connect to redis"
                    );
                    last_err = e;
                    if attempt < self.config.max_retries {
                        tokio::time::sleep(Duration::from_secs(RETRY_DELAY_SECS)).await;
                    }
                }
            }
        }
        Err(AppError::internal(format!(
            "failed to connect to redis after {} attempts: {last_err}",
            self.config.max_retries
        )))
    }

    /// Replace the shared client; the old manager is dropped, which closes it
    async fn reconnect(&self) -> AppResult<ConnectionManager> {
        let manager = self.connect_with_retry().await?;
        *self.client.write().await = Some(manager.clone());
        Ok(manager)
    }

    /// Get a live connection: read the shared client, ping it, reconnect on
    /// failure. The lock is released before any network call.
    async fn connection(&self) -> AppResult<ConnectionManager> {
        let current = self.client.read().await.clone();

        if let Some(mut manager) = current {
            match ping(&mut manager, self.config.timeout).await {
                Ok(()) => return Ok(manager),
                Err(e) => {
                    warn!(error = %e, "redis connection lost, attempting reconnect");
                }
            }
        }
        self.reconnect().await
    }
}

#[async_trait::async_trait]
impl CacheProvider for RedisCache {
    async fn new(config: CacheConfig) -> AppResult<Self> {
        let cache = Self {
            config,
            client: Arc::new(RwLock::new(None)),
        };

        let manager = cache.connect_with_retry().await?;
        *cache.client.write().await = Some(manager);
        info!(addr = %cache.config.addr, "connected to redis");
        Ok(cache)
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> AppResult<()> {
        let data = serde_json::to_vec(value)
            .map_err(|e| AppError::internal(format!("cache serialization failed: {e}")))?;
        let redis_key = key.to_string();
        let mut conn = self.connection().await?;

        let op = async {
            match ttl {
                Some(ttl) => {
                    conn.set_ex::<_, _, ()>(&redis_key, data, ttl.as_secs().max(1))
                        .await
                }
                None => conn.set::<_, _, ()>(&redis_key, data).await,
            }
        };

        timeout(self.config.timeout, op)
            .await
            .map_err(|_| AppError::internal("redis SET timed out"))?
            .map_err(|e| AppError::internal(format!("redis SET failed: {e}")))?;
        Ok(())
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let redis_key = key.to_string();
        let mut conn = self.connection().await?;

        let data: Option<Vec<u8>> = timeout(self.config.timeout, conn.get(&redis_key))
            .await
            .map_err(|_| AppError::internal("redis GET timed out"))?
            .map_err(|e| AppError::internal(format!("redis GET failed: {e}")))?;

        match data {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| AppError::internal(format!("cache deserialization failed: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn invalidate(&self, key: &CacheKey) -> AppResult<()> {
        let redis_key = key.to_string();
        let mut conn = self.connection().await?;

        timeout(self.config.timeout, conn.del::<_, ()>(&redis_key))
            .await
            .map_err(|_| AppError::internal("redis DEL timed out"))?
            .map_err(|e| AppError::internal(format!("redis DEL failed: {e}")))?;
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut conn = self.connection().await?;
        ping(&mut conn, self.config.timeout).await
    }

    async fn close(&self) -> AppResult<()> {
        // Dropping the manager closes the connection; repeated calls find the
        // slot already empty and succeed
        let previous = self.client.write().await.take();
        if previous.is_some() {
            debug!("redis connection closed");
        }
        Ok(())
    }
}

async fn ping(manager: &mut ConnectionManager, op_timeout: Duration) -> AppResult<()> {
    let pong: String = timeout(op_timeout, redis::cmd("PING").query_async(manager))
        .await
        .map_err(|_| AppError::internal("redis PING timed out"))?
        .map_err(|e| AppError::internal(format!("redis PING failed: {e}")))?;

    if pong == "PONG" {
        Ok(())
    } else {
        Err(AppError::internal(format!("unexpected PING reply: {pong}")))
    }
}
