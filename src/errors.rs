// ABOUTME: Centralized error handling and error types for the SSO service
// ABOUTME: Defines error codes, wire status mapping, and sanitized client responses
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Unified Error Handling System
//!
//! Every failure the service can surface is classified into an [`ErrorCode`].
//! The wire never sees internal error shapes: handlers return [`AppError`],
//! which renders a sanitized JSON body with the matching HTTP status.
//!
//! The credential-probing surfaces deliberately collapse distinct causes into
//! a single code: an unknown username, an unknown application, and a wrong
//! password all map to [`ErrorCode::InvalidCredentials`], and every negative
//! outcome of the HMAC gate maps to [`ErrorCode::Unauthenticated`] with one
//! shared message. The distinguishing detail is only ever logged locally.

use std::fmt::{self, Display};

use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::database_plugins::DatabaseError;

/// Standard error codes used throughout the application
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Input shape violation (empty field, whitespace, too short)
    InvalidInput,
    /// Unified signal for unknown user, unknown app, or wrong password
    InvalidCredentials,
    /// Registration-time uniqueness violation
    AlreadyExists,
    /// Missing or malformed application envelope, stale timestamp, or HMAC mismatch
    Unauthenticated,
    /// Method exists on the wire surface but has no implementation yet
    Unimplemented,
    /// Configuration is missing or invalid
    ConfigError,
    /// Database operation failed
    DatabaseError,
    /// Signing failure, RNG failure, or unrecoverable store/cache error
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::InvalidCredentials | Self::Unauthenticated => 401,
            Self::AlreadyExists => 409,
            Self::Unimplemented => 501,
            Self::ConfigError | Self::DatabaseError | Self::InternalError => 500,
        }
    }

    /// Get a client-safe description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidInput => "The provided input is invalid",
            Self::InvalidCredentials => "Invalid login or password",
            Self::AlreadyExists => "A resource with this identifier already exists",
            Self::Unauthenticated => "Request authentication failed",
            Self::Unimplemented => "This method is not implemented",
            Self::ConfigError => "Configuration error encountered",
            Self::DatabaseError => "Database operation failed",
            Self::InternalError => "An internal server error occurred",
        }
    }
}

/// Application error carrying a code and a human-readable message
#[derive(Debug, Clone, ThisError)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Input validation failure; the message is safe for the wire
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Unified invalid-credentials signal
    #[must_use]
    pub fn invalid_credentials() -> Self {
        Self::new(
            ErrorCode::InvalidCredentials,
            ErrorCode::InvalidCredentials.description(),
        )
    }

    /// Uniqueness violation at registration time
    #[must_use]
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyExists, message)
    }

    /// Application-gate rejection; the message is the shared wire message
    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthenticated, message)
    }

    /// Wire method without an implementation
    #[must_use]
    pub fn unimplemented(method: &str) -> Self {
        Self::new(ErrorCode::Unimplemented, format!("{method} is not implemented"))
    }

    /// Configuration failure
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Internal failure; the message is logged, never sent to the client
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Get sanitized message safe for client exposure.
    /// Internal error details are replaced with generic descriptions.
    #[must_use]
    pub fn sanitized_message(&self) -> String {
        match self.code {
            // Validation messages and the deliberately-uniform auth messages
            // are safe to expose as-is
            ErrorCode::InvalidInput
            | ErrorCode::InvalidCredentials
            | ErrorCode::AlreadyExists
            | ErrorCode::Unauthenticated
            | ErrorCode::Unimplemented => self.message.clone(),
            // Everything else gets the generic description
            _ => self.code.description().to_owned(),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::UserExists => Self::already_exists("user already exists"),
            DatabaseError::RefreshTokenExists => {
                Self::internal("refresh token collision not resolved")
            }
            DatabaseError::Sqlx(e) => Self::new(ErrorCode::DatabaseError, e.to_string()),
            DatabaseError::Corrupt(msg) => Self::new(ErrorCode::DatabaseError, msg),
        }
    }
}

/// Wire representation of an error
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code
    pub code: ErrorCode,
    /// Sanitized message
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        Self {
            message: err.sanitized_message(),
            code: err.code,
        }
    }
}

/// Convert `AppError` to an Axum `Response`
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use axum::http::StatusCode;
        use axum::Json;

        let status = StatusCode::from_u16(self.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(code = ?self.code, message = %self.message, "request failed");
        }

        (status, Json(ErrorResponse::from(self))).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
