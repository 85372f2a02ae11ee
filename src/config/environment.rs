// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Loads server, database, token, and cache configuration from environment variables
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Environment-based configuration management
//!
//! Configuration is constructed once at startup via [`ServerConfig::from_env`]
//! and passed explicitly into each component's constructor. Nothing reads the
//! environment after load.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::cache::CacheConfig;
use crate::constants::{cache, server, ttl};
use crate::errors::{AppError, AppResult};
use crate::logging::LoggingConfig;

/// Deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Local development; the application gate is bypassed
    Local,
    /// Development deployment; full request authentication
    Dev,
    /// Production deployment; full request authentication
    Prod,
}

impl Mode {
    /// Parse a mode string (`local`, `dev`, `prod`)
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unrecognized values
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "local" => Ok(Self::Local),
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(AppError::config(format!("invalid mode: {other}"))),
        }
    }

    /// Whether the HMAC application gate is bypassed in this mode
    #[must_use]
    pub const fn bypasses_app_auth(self) -> bool {
        matches!(self, Self::Local)
    }
}

/// Database connection configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite://...` or `postgres://...`)
    pub url: String,
}

impl DatabaseConfig {
    fn from_env() -> Self {
        Self {
            url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://sso.sqlite3".to_owned()),
        }
    }
}

/// Token lifetimes and signing-key settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Access-token lifetime
    pub token_ttl: Duration,
    /// Refresh-token lifetime
    pub refresh_token_ttl: Duration,
    /// Private-key active window
    pub key_ttl: Duration,
    /// Directory holding private-key PEM files
    pub keys_dir: PathBuf,
}

impl AuthConfig {
    fn from_env() -> Self {
        Self {
            token_ttl: duration_env("TOKEN_TTL_SECS", ttl::DEFAULT_TOKEN_TTL_SECS),
            refresh_token_ttl: duration_env(
                "REFRESH_TOKEN_TTL_SECS",
                ttl::DEFAULT_REFRESH_TOKEN_TTL_SECS,
            ),
            key_ttl: duration_env("KEY_TTL_SECS", ttl::DEFAULT_KEY_TTL_SECS),
            keys_dir: env::var("KEYS_DIR")
                .map_or_else(|_| PathBuf::from("keys"), PathBuf::from),
        }
    }
}

/// Top-level server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Deployment mode
    pub mode: Mode,
    /// Bind host
    pub host: String,
    /// HTTP port
    pub http_port: u16,
    /// Database settings
    pub database: DatabaseConfig,
    /// Token and key settings
    pub auth: AuthConfig,
    /// Cache settings
    pub cache: CacheConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    pub fn from_env() -> AppResult<Self> {
        // Load .env if present; absence is fine
        dotenvy::dotenv().ok();

        let mode = Mode::parse(&env::var("MODE").unwrap_or_else(|_| "dev".to_owned()))?;

        let config = Self {
            mode,
            host: env::var("HOST").unwrap_or_else(|_| server::DEFAULT_HOST.to_owned()),
            http_port: env::var("HTTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(server::DEFAULT_PORT),
            database: DatabaseConfig::from_env(),
            auth: AuthConfig::from_env(),
            cache: cache_config_from_env(),
            logging: LoggingConfig::from_env(),
        };

        config.validate()?;
        info!("configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.auth.token_ttl.is_zero() {
            return Err(AppError::config("token TTL must be positive"));
        }
        if self.auth.key_ttl.is_zero() {
            return Err(AppError::config("key TTL must be positive"));
        }
        if self.auth.keys_dir.as_os_str().is_empty() {
            return Err(AppError::config("keys directory must be set"));
        }
        if self.database.url.is_empty() {
            return Err(AppError::config("database URL must be set"));
        }
        Ok(())
    }
}

fn cache_config_from_env() -> CacheConfig {
    CacheConfig {
        use_memory: env::var("CACHE_BACKEND").as_deref() == Ok("memory"),
        addr: env::var("REDIS_ADDR").unwrap_or_else(|_| "127.0.0.1:6379".to_owned()),
        username: env::var("REDIS_USER").ok().filter(|s| !s.is_empty()),
        password: env::var("REDIS_PASSWORD").ok().filter(|s| !s.is_empty()),
        db: env::var("REDIS_DB")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        max_retries: env::var("CACHE_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(cache::DEFAULT_MAX_RETRIES),
        dial_timeout: duration_env("CACHE_DIAL_TIMEOUT_SECS", cache::DEFAULT_DIAL_TIMEOUT_SECS),
        timeout: duration_env("CACHE_TIMEOUT_SECS", cache::DEFAULT_TIMEOUT_SECS),
        token_ttl: duration_env("CACHE_TOKEN_TTL_SECS", ttl::DEFAULT_TOKEN_TTL_SECS),
        memory_capacity: env::var("CACHE_MEMORY_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(cache::DEFAULT_MEMORY_CAPACITY),
    }
}

fn duration_env(var: &str, default_secs: u64) -> Duration {
    Duration::from_secs(
        env::var(var)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default_secs),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing() {
        assert_eq!(Mode::parse("local").unwrap(), Mode::Local);
        assert_eq!(Mode::parse("dev").unwrap(), Mode::Dev);
        assert_eq!(Mode::parse("prod").unwrap(), Mode::Prod);
        assert!(Mode::parse("staging").is_err());
    }

    #[test]
    fn only_local_bypasses_the_gate() {
        assert!(Mode::Local.bypasses_app_auth());
        assert!(!Mode::Dev.bypasses_app_auth());
        assert!(!Mode::Prod.bypasses_app_auth());
    }
}
