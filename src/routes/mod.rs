// ABOUTME: HTTP route assembly for the SSO service
// ABOUTME: Wires authentication RPCs and the key-set endpoint onto the router
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

/// Authentication RPC handlers
pub mod auth;

/// Key-set endpoint
pub mod jwks;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::server::ServerResources;

/// Build the service router
#[must_use]
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/is-admin", post(auth::is_admin))
        .route("/api/auth/refresh", post(auth::refresh_token))
        .route("/.well-known/jwks.json", get(jwks::get_jwks))
        .with_state(resources)
}
