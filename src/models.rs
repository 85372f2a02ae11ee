// ABOUTME: Domain models for users, applications, tokens, and request metadata
// ABOUTME: Shared data structures crossing the storage, cache, and service layers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Role assigned to a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum UserRole {
    /// Regular end user
    Regular,
    /// Application administrator
    Admin,
    /// Cross-application administrator
    SuperAdmin,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Regular
    }
}

impl From<UserRole> for i64 {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Regular => 1,
            UserRole::Admin => 2,
            UserRole::SuperAdmin => 3,
        }
    }
}

impl TryFrom<i64> for UserRole {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Regular),
            2 => Ok(Self::Admin),
            3 => Ok(Self::SuperAdmin),
            other => Err(format!("unknown role id: {other}")),
        }
    }
}

/// A registered end user.
///
/// The plaintext password is never part of this model: it only exists inside
/// request payloads, so neither the durable store nor the cache can observe it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique numeric identifier
    pub id: i64,
    /// Case-sensitive username, unique across the service
    pub username: String,
    /// Bcrypt password hash
    pub pass_hash: String,
    /// Role tag
    pub role: UserRole,
}

/// A registered client application.
///
/// Seeded out of band; immutable at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    /// Non-zero application identifier
    pub id: u32,
    /// Display name
    pub name: String,
    /// Shared secret used as the HMAC key for the request gate
    pub secret: String,
}

/// A single issued credential with its absolute expiry (UNIX seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Credential material
    pub token: String,
    /// Absolute expiry, UNIX seconds UTC
    pub expires_at: i64,
}

/// The access/refresh pair returned by a successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived RS256-signed access token
    pub access_token: Token,
    /// Long-lived opaque refresh token
    pub refresh_token: Token,
}

/// Application-authentication envelope carried by every gated request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthMetadata {
    /// Calling application identifier
    pub app_id: u32,
    /// Request timestamp, RFC 3339 UTC
    pub timestamp: String,
}

/// Capability exposed by every request type subject to the application gate.
///
/// The gate consumes this instead of inspecting request bodies reflectively;
/// a request without metadata is rejected before any handler logic runs.
pub trait AuthenticatedRequest {
    /// The authentication envelope, if the client supplied one
    fn auth_metadata(&self) -> Option<&AuthMetadata>;
}

/// Validate a username: non-empty and free of whitespace
///
/// # Errors
///
/// Returns a validation error naming the offending rule
pub fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() {
        return Err(AppError::validation("username cannot be empty"));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(AppError::validation("username cannot contain spaces"));
    }
    Ok(())
}

/// Validate a password against the minimum length rule
///
/// # Errors
///
/// Returns a validation error naming the offending rule
pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::validation("password cannot be empty"));
    }
    if password.len() < crate::constants::auth::MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(format!(
            "password must be at least {} characters",
            crate::constants::auth::MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Validate an application identifier (zero is reserved/invalid)
///
/// # Errors
///
/// Returns a validation error if the identifier is zero
pub fn validate_app_id(app_id: u32) -> Result<(), AppError> {
    if app_id == 0 {
        return Err(AppError::validation("app id cannot be zero"));
    }
    Ok(())
}
