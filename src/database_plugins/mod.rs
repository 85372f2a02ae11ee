// ABOUTME: Database abstraction layer for the SSO service
// ABOUTME: Plugin architecture with SQLite and PostgreSQL backends behind one trait
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{App, Token, User};

pub mod factory;
pub mod sqlite;

#[cfg(feature = "postgresql")]
pub mod postgres;

/// Failures surfaced by the durable store.
///
/// The two uniqueness violations are distinct domain signals: `UserExists`
/// resolves the Register race, and `RefreshTokenExists` drives the
/// regenerate-and-retry loop during login.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Insert hit the username uniqueness constraint
    #[error("user already exists")]
    UserExists,
    /// Upsert hit the global refresh-token uniqueness constraint
    #[error("refresh token already exists")]
    RefreshTokenExists,
    /// Underlying driver failure
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    /// A stored row failed domain validation on read
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Result type for durable-store operations
pub type DbResult<T> = Result<T, DatabaseError>;

/// Core database abstraction trait.
///
/// Exactly the three capabilities the service needs: user read/write,
/// application read (plus the out-of-band seeding write), and refresh-token
/// upsert/delete.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + Clone {
    /// Create a new database connection pool
    async fn new(database_url: &str) -> DbResult<Self>
    where
        Self: Sized;

    /// Create the schema if it does not exist yet
    async fn migrate(&self) -> DbResult<()>;

    // ================================
    // Users
    // ================================

    /// Insert a new user with the given bcrypt hash.
    ///
    /// A username uniqueness violation maps to [`DatabaseError::UserExists`].
    async fn save_user(&self, username: &str, pass_hash: &str) -> DbResult<()>;

    /// Look up a user by username
    async fn get_user(&self, username: &str) -> DbResult<Option<User>>;

    // ================================
    // Applications
    // ================================

    /// Look up a registered application
    async fn get_app(&self, app_id: u32) -> DbResult<Option<App>>;

    /// Upsert an application record (seeding path)
    async fn save_app(&self, app: &App) -> DbResult<()>;

    // ================================
    // Refresh tokens
    // ================================

    /// Upsert the refresh token for `(user_id, app_id)`, replacing any prior
    /// row for that pair.
    ///
    /// A collision on the global token-string constraint maps to
    /// [`DatabaseError::RefreshTokenExists`].
    async fn save_refresh_token(&self, user_id: i64, app_id: u32, token: &Token) -> DbResult<()>;

    /// Read the current refresh token for `(user_id, app_id)`
    async fn get_refresh_token(&self, user_id: i64, app_id: u32) -> DbResult<Option<Token>>;

    /// Delete a refresh token row if the stored string matches
    async fn delete_refresh_token(&self, user_id: i64, app_id: u32, token: &str) -> DbResult<()>;

    /// Close the connection pool
    async fn close(&self);
}
