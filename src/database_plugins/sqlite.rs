// ABOUTME: SQLite database implementation of the storage trait
// ABOUTME: Default backend for development and single-node deployments
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use super::{DatabaseError, DatabaseProvider, DbResult};
use crate::models::{App, Token, User, UserRole};

/// SQLite database implementation
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

#[async_trait]
impl DatabaseProvider for SqliteDatabase {
    async fn new(database_url: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // An in-memory database exists per connection; the pool must not
        // hand out a second one
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    async fn migrate(&self) -> DbResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                pass_hash TEXT NOT NULL,
                role_id INTEGER NOT NULL DEFAULT 1
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS apps (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                secret TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS refresh_tokens (
                user_id INTEGER NOT NULL,
                app_id INTEGER NOT NULL,
                r_token TEXT NOT NULL UNIQUE,
                expire_at INTEGER NOT NULL,
                UNIQUE (user_id, app_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_user(&self, username: &str, pass_hash: &str) -> DbResult<()> {
        sqlx::query("INSERT INTO users (username, pass_hash, role_id) VALUES (?, ?, ?)")
            .bind(username)
            .bind(pass_hash)
            .bind(i64::from(UserRole::Regular))
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => DatabaseError::UserExists,
                _ => DatabaseError::Sqlx(e),
            })?;
        Ok(())
    }

    async fn get_user(&self, username: &str) -> DbResult<Option<User>> {
        let row = sqlx::query("SELECT id, username, pass_hash, role_id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let role = UserRole::try_from(row.get::<i64, _>("role_id"))
                .map_err(DatabaseError::Corrupt)?;
            Ok(User {
                id: row.get("id"),
                username: row.get("username"),
                pass_hash: row.get("pass_hash"),
                role,
            })
        })
        .transpose()
    }

    async fn get_app(&self, app_id: u32) -> DbResult<Option<App>> {
        let row = sqlx::query("SELECT id, name, secret FROM apps WHERE id = ?")
            .bind(i64::from(app_id))
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let id = u32::try_from(row.get::<i64, _>("id"))
                .map_err(|_| DatabaseError::Corrupt("app id out of range".to_owned()))?;
            Ok(App {
                id,
                name: row.get("name"),
                secret: row.get("secret"),
            })
        })
        .transpose()
    }

    async fn save_app(&self, app: &App) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO apps (id, name, secret) VALUES (?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET name = excluded.name, secret = excluded.secret",
        )
        .bind(i64::from(app.id))
        .bind(&app.name)
        .bind(&app.secret)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_refresh_token(&self, user_id: i64, app_id: u32, token: &Token) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, app_id, r_token, expire_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (user_id, app_id) DO UPDATE
             SET r_token = excluded.r_token, expire_at = excluded.expire_at",
        )
        .bind(user_id)
        .bind(i64::from(app_id))
        .bind(&token.token)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db)
                if db.is_unique_violation() && db.message().contains("r_token") =>
            {
                DatabaseError::RefreshTokenExists
            }
            _ => DatabaseError::Sqlx(e),
        })?;
        Ok(())
    }

    async fn get_refresh_token(&self, user_id: i64, app_id: u32) -> DbResult<Option<Token>> {
        let row = sqlx::query(
            "SELECT r_token, expire_at FROM refresh_tokens WHERE user_id = ? AND app_id = ?",
        )
        .bind(user_id)
        .bind(i64::from(app_id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Token {
            token: row.get("r_token"),
            expires_at: row.get("expire_at"),
        }))
    }

    async fn delete_refresh_token(&self, user_id: i64, app_id: u32, token: &str) -> DbResult<()> {
        sqlx::query(
            "DELETE FROM refresh_tokens WHERE user_id = ? AND app_id = ? AND r_token = ?",
        )
        .bind(user_id)
        .bind(i64::from(app_id))
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
