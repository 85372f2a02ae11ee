// ABOUTME: Key-set endpoint serving the active public keys as a JWKS document
// ABOUTME: Stateless projection over the signing-key manager
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::errors::AppResult;
use crate::jwks::JsonWebKeySet;
use crate::server::ServerResources;

/// Serve the published public keys.
///
/// Downstream services fetch this once and verify many access tokens without
/// contacting the issuer. The endpoint is not gated: key material is public.
///
/// # Errors
///
/// Returns an internal error if key regeneration is needed and fails
pub async fn get_jwks(
    State(resources): State<Arc<ServerResources>>,
) -> AppResult<Json<JsonWebKeySet>> {
    let keys = resources.jwks.get_public_keys()?;
    Ok(Json(JsonWebKeySet { keys }))
}
