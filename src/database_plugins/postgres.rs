// ABOUTME: PostgreSQL database implementation of the storage trait
// ABOUTME: Production backend, enabled with the postgresql feature
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use super::{DatabaseError, DatabaseProvider, DbResult};
use crate::models::{App, Token, User, UserRole};

/// PostgreSQL database implementation
#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
}

#[async_trait]
impl DatabaseProvider for PostgresDatabase {
    async fn new(database_url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    async fn migrate(&self) -> DbResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                pass_hash TEXT NOT NULL,
                role_id BIGINT NOT NULL DEFAULT 1
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS apps (
                id BIGINT PRIMARY KEY,
                name TEXT NOT NULL,
                secret TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS refresh_tokens (
                user_id BIGINT NOT NULL,
                app_id BIGINT NOT NULL,
                r_token TEXT NOT NULL UNIQUE,
                expire_at BIGINT NOT NULL,
                UNIQUE (user_id, app_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_user(&self, username: &str, pass_hash: &str) -> DbResult<()> {
        sqlx::query("INSERT INTO users (username, pass_hash, role_id) VALUES ($1, $2, $3)")
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
        let row =
            sqlx::query("SELECT id, username, pass_hash, role_id FROM users WHERE username = $1")
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
        let row = sqlx::query("SELECT id, name, secret FROM apps WHERE id = $1")
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
            "INSERT INTO apps (id, name, secret) VALUES ($1, $2, $3)
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
             VALUES ($1, $2, $3, $4)
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
            "SELECT r_token, expire_at FROM refresh_tokens WHERE user_id = $1 AND app_id = $2",
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
            "DELETE FROM refresh_tokens WHERE user_id = $1 AND app_id = $2 AND r_token = $3",
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
