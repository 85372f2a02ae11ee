// ABOUTME: Token minting for the authentication service
// ABOUTME: Produces RS256-signed access tokens and random opaque refresh tokens
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Access and Refresh Token Minting
//!
//! Access tokens are compact RS256 JWTs carrying the signing key id both in
//! the header and in the claims, so verifiers can select the right public key
//! from the published key set. Refresh tokens are 32 random bytes, URL-safe
//! base64 encoded; their uniqueness is enforced by the durable store.

use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE, Engine};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::constants::auth::REFRESH_TOKEN_BYTES;
use crate::errors::{AppError, AppResult};
use crate::jwks::{JsonWebKey, RsaKeyPair};
use crate::models::{App, Token, TokenPair, User};

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Signing key id (also present in the JWT header)
    pub kid: String,
    /// User identifier
    pub user_id: i64,
    /// Role tag
    pub role_id: i64,
    /// Username
    pub username: String,
    /// Application the token was issued for
    pub app_id: u32,
    /// Absolute expiry, UNIX seconds UTC
    pub exp: i64,
}

/// Mints credential pairs for successful logins
#[derive(Debug, Clone)]
pub struct AuthManager {
    token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl AuthManager {
    /// Create a manager with the configured lifetimes
    #[must_use]
    pub const fn new(token_ttl: Duration, refresh_token_ttl: Duration) -> Self {
        Self {
            token_ttl,
            refresh_token_ttl,
        }
    }

    /// Mint the access/refresh pair for a successful login
    ///
    /// # Errors
    ///
    /// Returns an error if signing or the RNG fails
    pub fn generate_token_pair(
        &self,
        user: &User,
        app: &App,
        key: &RsaKeyPair,
    ) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.generate_access_token(user, app, key)?,
            refresh_token: self.generate_refresh_token()?,
        })
    }

    /// Sign an RS256 access token with the given key
    ///
    /// # Errors
    ///
    /// Returns an error if PEM export or signing fails
    pub fn generate_access_token(
        &self,
        user: &User,
        app: &App,
        key: &RsaKeyPair,
    ) -> AppResult<Token> {
        let expires_at = (Utc::now() + self.token_ttl).timestamp();

        let claims = Claims {
            kid: key.kid.clone(),
            user_id: user.id,
            role_id: user.role.into(),
            username: user.username.clone(),
            app_id: app.id,
            exp: expires_at,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(key.kid.clone());

        let encoding_key = key
            .encoding_key()
            .map_err(|e| AppError::internal(format!("failed to prepare signing key: {e}")))?;

        let token = jsonwebtoken::encode(&header, &claims, &encoding_key)
            .map_err(|e| AppError::internal(format!("failed to sign access token: {e}")))?;

        Ok(Token {
            token,
            expires_at,
        })
    }

    /// Mint a fresh random refresh token
    ///
    /// # Errors
    ///
    /// Returns an error if the system RNG fails
    pub fn generate_refresh_token(&self) -> AppResult<Token> {
        let mut bytes = [0_u8; REFRESH_TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AppError::internal(format!("rng failure: {e}")))?;

        Ok(Token {
            token: URL_SAFE.encode(bytes),
            expires_at: (Utc::now() + self.refresh_token_ttl).timestamp(),
        })
    }

    /// Verify an access token against a published key-set entry and return
    /// its claims
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be reconstructed or the token fails
    /// verification
    pub fn decode_access_token(token: &str, jwk: &JsonWebKey) -> AppResult<Claims> {
        let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| AppError::internal(format!("failed to reconstruct public key: {e}")))?;

        let validation = Validation::new(Algorithm::RS256);
        let data = jsonwebtoken::decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| AppError::unauthenticated(format!("invalid access token: {e}")))?;
        Ok(data.claims)
    }
}
