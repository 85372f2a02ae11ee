// ABOUTME: Cached-storage façade binding the durable store to the cache
// ABOUTME: Read-through lookups with best-effort write-through for users and apps
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Read-through/write-through storage façade.
//!
//! Lookup order is cache first, durable store second. A cache miss or a cache
//! transport failure both degrade to the durable path; the caller never sees
//! them. A durable miss is reported as the unified invalid-credentials signal
//! so the wire cannot distinguish "no such user" from "wrong password".

use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{factory::Cache, CacheKey};
use crate::database_plugins::factory::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{App, User};

/// Unified lookup surface over the durable store and the cache
#[derive(Clone)]
pub struct CachedStorage {
    database: Database,
    cache: Cache,
    user_ttl: Duration,
}

impl CachedStorage {
    /// Bind a durable store and a cache; `user_ttl` bounds cached user records
    #[must_use]
    pub fn new(database: Database, cache: Cache, user_ttl: Duration) -> Self {
        Self {
            database,
            cache,
            user_ttl,
        }
    }

    /// Look up a user, consulting the cache first.
    ///
    /// # Errors
    ///
    /// A durable miss returns the invalid-credentials signal; durable-store
    /// failures propagate.
    pub async fn get_user(&self, username: &str, app_id: u32) -> AppResult<User> {
        let key = CacheKey::User {
            app_id,
            username: username.to_owned(),
        };

        match self.cache.get::<User>(&key).await {
            Ok(Some(user)) => {
                debug!(username, app_id, "user served from cache");
                return Ok(user);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(username, app_id, error = %e, "cache lookup failed, using durable store");
            }
        }

        let user = self
            .database
            .get_user(username)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| {
                warn!(username, "user not found");
                AppError::invalid_credentials()
            })?;

        self.save_user(&user, app_id).await;
        Ok(user)
    }

    /// Look up an application, consulting the cache first.
    ///
    /// # Errors
    ///
    /// A durable miss returns the invalid-credentials signal; durable-store
    /// failures propagate.
    pub async fn get_app(&self, app_id: u32) -> AppResult<App> {
        let key = CacheKey::App { app_id };

        match self.cache.get::<App>(&key).await {
            Ok(Some(app)) => {
                debug!(app_id, "app served from cache");
                return Ok(app);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(app_id, error = %e, "cache lookup failed, using durable store");
            }
        }

        let app = self
            .database
            .get_app(app_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| {
                warn!(app_id, "app not found");
                AppError::invalid_credentials()
            })?;

        self.save_app(&app).await;
        Ok(app)
    }

    /// Write a user record through to the cache with the user TTL.
    ///
    /// Best-effort: failures are logged, never propagated. The model carries
    /// no plaintext password, so the cache cannot either.
    pub async fn save_user(&self, user: &User, app_id: u32) {
        let key = CacheKey::User {
            app_id,
            username: user.username.clone(),
        };
        if let Err(e) = self.cache.set(&key, user, Some(self.user_ttl)).await {
            warn!(username = %user.username, app_id, error = %e, "failed to cache user");
        } else {
            debug!(username = %user.username, app_id, "user cached");
        }
    }

    /// Write an application record through to the cache without expiry.
    ///
    /// Best-effort: failures are logged, never propagated.
    pub async fn save_app(&self, app: &App) {
        let key = CacheKey::App { app_id: app.id };
        if let Err(e) = self.cache.set(&key, app, None).await {
            warn!(app_id = app.id, error = %e, "failed to cache app");
        } else {
            debug!(app_id = app.id, "app cached");
        }
    }

    /// Direct access to the durable store (registration, refresh tokens)
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Direct access to the cache (lifecycle management)
    #[must_use]
    pub fn cache(&self) -> &Cache {
        &self.cache
    }
}
