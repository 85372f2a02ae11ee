// ABOUTME: Database factory for URL-based backend selection
// ABOUTME: Dispatches storage operations to the SQLite or PostgreSQL provider
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use tracing::info;

use super::sqlite::SqliteDatabase;
use super::{DatabaseProvider, DbResult};
use crate::models::{App, Token, User};

#[cfg(feature = "postgresql")]
use super::postgres::PostgresDatabase;

/// Unified database handle over the configured backend
#[derive(Clone)]
pub enum Database {
    /// SQLite backend (default)
    Sqlite(SqliteDatabase),
    /// PostgreSQL backend
    #[cfg(feature = "postgresql")]
    Postgres(PostgresDatabase),
}

impl Database {
    /// Open a connection pool for the backend selected by the URL scheme
    ///
    /// # Errors
    ///
    /// Returns an error if the URL scheme is unsupported or the connection
    /// fails
    pub async fn new(database_url: &str) -> DbResult<Self> {
        if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
            #[cfg(feature = "postgresql")]
            {
                info!("connecting to PostgreSQL database");
                return Ok(Self::Postgres(PostgresDatabase::new(database_url).await?));
            }
            #[cfg(not(feature = "postgresql"))]
            {
                return Err(super::DatabaseError::Corrupt(
                    "PostgreSQL support not compiled in (enable the postgresql feature)"
                        .to_owned(),
                ));
            }
        }

        info!("connecting to SQLite database");
        Ok(Self::Sqlite(SqliteDatabase::new(database_url).await?))
    }

    /// Create the schema if it does not exist yet
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails
    pub async fn migrate(&self) -> DbResult<()> {
        match self {
            Self::Sqlite(db) => db.migrate().await,
            #[cfg(feature = "postgresql")]
            Self::Postgres(db) => db.migrate().await,
        }
    }

    /// Insert a new user with the given bcrypt hash
    ///
    /// # Errors
    ///
    /// Maps a username uniqueness violation to `DatabaseError::UserExists`
    pub async fn save_user(&self, username: &str, pass_hash: &str) -> DbResult<()> {
        match self {
            Self::Sqlite(db) => db.save_user(username, pass_hash).await,
            #[cfg(feature = "postgresql")]
            Self::Postgres(db) => db.save_user(username, pass_hash).await,
        }
    }

    /// Look up a user by username
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_user(&self, username: &str) -> DbResult<Option<User>> {
        match self {
            Self::Sqlite(db) => db.get_user(username).await,
            #[cfg(feature = "postgresql")]
            Self::Postgres(db) => db.get_user(username).await,
        }
    }

    /// Look up a registered application
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_app(&self, app_id: u32) -> DbResult<Option<App>> {
        match self {
            Self::Sqlite(db) => db.get_app(app_id).await,
            #[cfg(feature = "postgresql")]
            Self::Postgres(db) => db.get_app(app_id).await,
        }
    }

    /// Upsert an application record (seeding path)
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    pub async fn save_app(&self, app: &App) -> DbResult<()> {
        match self {
            Self::Sqlite(db) => db.save_app(app).await,
            #[cfg(feature = "postgresql")]
            Self::Postgres(db) => db.save_app(app).await,
        }
    }

    /// Upsert the refresh token for `(user_id, app_id)`
    ///
    /// # Errors
    ///
    /// Maps a global token-string collision to
    /// `DatabaseError::RefreshTokenExists`
    pub async fn save_refresh_token(
        &self,
        user_id: i64,
        app_id: u32,
        token: &Token,
    ) -> DbResult<()> {
        match self {
            Self::Sqlite(db) => db.save_refresh_token(user_id, app_id, token).await,
            #[cfg(feature = "postgresql")]
            Self::Postgres(db) => db.save_refresh_token(user_id, app_id, token).await,
        }
    }

    /// Read the current refresh token for `(user_id, app_id)`
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    pub async fn get_refresh_token(&self, user_id: i64, app_id: u32) -> DbResult<Option<Token>> {
        match self {
            Self::Sqlite(db) => db.get_refresh_token(user_id, app_id).await,
            #[cfg(feature = "postgresql")]
            Self::Postgres(db) => db.get_refresh_token(user_id, app_id).await,
        }
    }

    /// Delete a refresh token row if the stored string matches
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    pub async fn delete_refresh_token(
        &self,
        user_id: i64,
        app_id: u32,
        token: &str,
    ) -> DbResult<()> {
        match self {
            Self::Sqlite(db) => db.delete_refresh_token(user_id, app_id, token).await,
            #[cfg(feature = "postgresql")]
            Self::Postgres(db) => db.delete_refresh_token(user_id, app_id, token).await,
        }
    }

    /// Close the connection pool
    pub async fn close(&self) {
        match self {
            Self::Sqlite(db) => db.close().await,
            #[cfg(feature = "postgresql")]
            Self::Postgres(db) => db.close().await,
        }
    }
}
