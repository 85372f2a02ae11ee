// ABOUTME: Authentication RPC handlers for registration, login, and reserved methods
// ABOUTME: Thin wrappers running the application gate before delegating to the service layer
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Authentication routes.
//!
//! Each handler runs the HMAC application gate first, then delegates to
//! [`crate::services::AuthService`]. Request types expose their envelope via
//! [`AuthenticatedRequest`], which is what the gate consumes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppResult;
use crate::models::{AuthenticatedRequest, AuthMetadata, Token, TokenPair};
use crate::server::ServerResources;

/// User registration request
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    /// Desired username
    pub username: String,
    /// Plaintext password (hashed immediately, never stored)
    pub password: String,
    /// Application envelope
    #[serde(default)]
    pub metadata: Option<AuthMetadata>,
}

impl AuthenticatedRequest for RegisterRequest {
    fn auth_metadata(&self) -> Option<&AuthMetadata> {
        self.metadata.as_ref()
    }
}

/// User registration response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Whether the account was created
    pub success: bool,
}

/// User login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Username
    pub username: String,
    /// Plaintext password
    pub password: String,
    /// Application envelope; also names the application the login targets
    #[serde(default)]
    pub metadata: Option<AuthMetadata>,
}

impl AuthenticatedRequest for LoginRequest {
    fn auth_metadata(&self) -> Option<&AuthMetadata> {
        self.metadata.as_ref()
    }
}

/// A credential with its absolute expiry, as it appears on the wire
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Credential material
    pub token: String,
    /// Absolute expiry, UNIX seconds UTC
    pub expired_at: i64,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            token: token.token,
            expired_at: token.expires_at,
        }
    }
}

/// User login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Short-lived signed access token
    pub access_token: TokenResponse,
    /// Long-lived opaque refresh token
    pub refresh_token: TokenResponse,
}

impl From<TokenPair> for LoginResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token.into(),
            refresh_token: pair.refresh_token.into(),
        }
    }
}

/// Logout response (reserved)
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    /// Whether the session was invalidated
    pub success: bool,
}

/// Logout request (reserved)
#[derive(Debug, Clone, Deserialize)]
pub struct LogoutRequest {
    /// Access token to invalidate
    pub token: String,
    /// Application envelope
    #[serde(default)]
    pub metadata: Option<AuthMetadata>,
}

impl AuthenticatedRequest for LogoutRequest {
    fn auth_metadata(&self) -> Option<&AuthMetadata> {
        self.metadata.as_ref()
    }
}

/// Admin-check request (reserved)
#[derive(Debug, Clone, Deserialize)]
pub struct IsAdminRequest {
    /// Username to check
    pub username: String,
    /// Application envelope
    #[serde(default)]
    pub metadata: Option<AuthMetadata>,
}

impl AuthenticatedRequest for IsAdminRequest {
    fn auth_metadata(&self) -> Option<&AuthMetadata> {
        self.metadata.as_ref()
    }
}

/// Refresh-token exchange request (reserved)
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenRequest {
    /// Refresh token being exchanged
    pub token: String,
    /// Application envelope
    #[serde(default)]
    pub metadata: Option<AuthMetadata>,
}

impl AuthenticatedRequest for RefreshTokenRequest {
    fn auth_metadata(&self) -> Option<&AuthMetadata> {
        self.metadata.as_ref()
    }
}

fn auth_header(headers: &HeaderMap) -> Option<&str> {
    headers.get("authorization").and_then(|v| v.to_str().ok())
}

/// Handle user registration
///
/// # Errors
///
/// Returns gate, validation, already-exists, or internal errors
pub async fn register(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> AppResult<Json<RegisterResponse>> {
    resources
        .validator
        .validate(auth_header(&headers), request.auth_metadata())
        .await?;

    resources
        .auth_service
        .register(&request.username, &request.password)
        .await?;
    Ok(Json(RegisterResponse { success: true }))
}

/// Handle user login
///
/// # Errors
///
/// Returns gate, validation, invalid-credentials, or internal errors
pub async fn login(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    resources
        .validator
        .validate(auth_header(&headers), request.auth_metadata())
        .await?;

    // A missing envelope leaves app_id at the reserved zero value, which
    // input validation rejects before any lookup
    let app_id = request.metadata.as_ref().map_or(0, |m| m.app_id);

    let pair = resources
        .auth_service
        .login(&request.username, &request.password, app_id)
        .await?;
    Ok(Json(pair.into()))
}

/// Handle logout (reserved; always unimplemented)
///
/// # Errors
///
/// Returns gate errors or the unimplemented signal
pub async fn logout(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<LogoutRequest>,
) -> AppResult<Json<LogoutResponse>> {
    resources
        .validator
        .validate(auth_header(&headers), request.auth_metadata())
        .await?;

    let success = resources.auth_service.logout(&request.token)?;
    Ok(Json(LogoutResponse { success }))
}

/// Admin-check response (reserved)
#[derive(Debug, Serialize, Deserialize)]
pub struct IsAdminResponse {
    /// Whether the user holds an admin role
    pub is_admin: bool,
}

/// Handle admin check (reserved; always unimplemented)
///
/// # Errors
///
/// Returns gate errors or the unimplemented signal
pub async fn is_admin(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<IsAdminRequest>,
) -> AppResult<Json<IsAdminResponse>> {
    resources
        .validator
        .validate(auth_header(&headers), request.auth_metadata())
        .await?;

    let is_admin = resources.auth_service.is_admin(&request.username)?;
    Ok(Json(IsAdminResponse { is_admin }))
}

/// Handle refresh-token exchange (reserved; always unimplemented)
///
/// # Errors
///
/// Returns gate errors or the unimplemented signal
pub async fn refresh_token(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<RefreshTokenRequest>,
) -> AppResult<Json<LoginResponse>> {
    resources
        .validator
        .validate(auth_header(&headers), request.auth_metadata())
        .await?;

    let pair = resources.auth_service.refresh_token(&request.token)?;
    Ok(Json(pair.into()))
}
