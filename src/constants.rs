// ABOUTME: Application-wide constants grouped by domain
// ABOUTME: Single source of truth for limits, TTL defaults, and protocol values
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

/// Authentication and credential limits
pub mod auth {
    /// Minimum accepted password length
    pub const MIN_PASSWORD_LENGTH: usize = 5;

    /// Raw byte length of a refresh token before base64 encoding
    pub const REFRESH_TOKEN_BYTES: usize = 32;

    /// Attempts to persist a refresh token before giving up on global
    /// uniqueness collisions
    pub const REFRESH_TOKEN_SAVE_ATTEMPTS: u32 = 10;

    /// Oldest request timestamp the HMAC gate accepts, in seconds
    pub const TIMESTAMP_MAX_AGE_SECS: i64 = 120;

    /// Furthest-future request timestamp the HMAC gate accepts, in seconds
    pub const TIMESTAMP_MAX_SKEW_SECS: i64 = 5;
}

/// Signing-key material parameters
pub mod keys {
    /// RSA modulus size for access-token signing keys
    pub const RSA_KEY_SIZE: usize = 3072;

    /// Filename extension for persisted private keys
    pub const PEM_EXTENSION: &str = "pem";

    /// Key directory permissions (owner-only)
    #[cfg(unix)]
    pub const KEYS_DIR_MODE: u32 = 0o700;

    /// Private-key file permissions (owner read/write)
    #[cfg(unix)]
    pub const KEY_FILE_MODE: u32 = 0o600;
}

/// Cache keyspace and connection management
pub mod cache {
    /// Cache key prefix for user records
    pub const USER_KEY_PREFIX: &str = "users";

    /// Cache key prefix for application records
    pub const APP_KEY_PREFIX: &str = "apps";

    /// Fixed delay between cache reconnection attempts, in seconds
    pub const RETRY_DELAY_SECS: u64 = 4;

    /// Default number of connection attempts before startup fails
    pub const DEFAULT_MAX_RETRIES: u32 = 5;

    /// Default per-attempt dial timeout, in seconds
    pub const DEFAULT_DIAL_TIMEOUT_SECS: u64 = 10;

    /// Default operation timeout, in seconds
    pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

    /// Default capacity of the in-memory cache backend
    pub const DEFAULT_MEMORY_CAPACITY: usize = 10_000;
}

/// Default token and key lifetimes
pub mod ttl {
    /// Access-token lifetime: 1 hour
    pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3_600;

    /// Refresh-token lifetime: 168 hours
    pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 604_800;

    /// Private-key active window: 24 hours
    pub const DEFAULT_KEY_TTL_SECS: u64 = 86_400;
}

/// Server identity and networking defaults
pub mod server {
    /// Service name used in structured logs
    pub const SERVICE_NAME: &str = "sso-server";

    /// Default bind address
    pub const DEFAULT_HOST: &str = "127.0.0.1";

    /// Default HTTP port
    pub const DEFAULT_PORT: u16 = 8082;

    /// Grace period for in-flight requests during shutdown, in seconds
    pub const SHUTDOWN_GRACE_SECS: u64 = 5;
}
