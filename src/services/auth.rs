// ABOUTME: Authentication service orchestrating registration and login
// ABOUTME: Coordinates password hashing, token minting, refresh persistence, and cache hydration
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::AuthManager;
use crate::constants::auth::REFRESH_TOKEN_SAVE_ATTEMPTS;
use crate::database_plugins::DatabaseError;
use crate::errors::{AppError, AppResult};
use crate::jwks::JwksManager;
use crate::models::{validate_app_id, validate_password, validate_username, TokenPair};
use crate::storage::CachedStorage;

/// Registration and login orchestration.
///
/// Stateless across concurrent calls: serialization is delegated to the
/// storage façade, the durable store's uniqueness constraints, and the key
/// manager's lock.
#[derive(Clone)]
pub struct AuthService {
    storage: CachedStorage,
    jwks: Arc<JwksManager>,
    auth_manager: AuthManager,
}

impl AuthService {
    /// Assemble the service from its collaborators
    #[must_use]
    pub const fn new(
        storage: CachedStorage,
        jwks: Arc<JwksManager>,
        auth_manager: AuthManager,
    ) -> Self {
        Self {
            storage,
            jwks,
            auth_manager,
        }
    }

    /// Validate the full login input triple
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first offending rule
    pub fn validate_data(username: &str, password: &str, app_id: u32) -> AppResult<()> {
        validate_username(username)?;
        validate_password(password)?;
        validate_app_id(app_id)?;
        Ok(())
    }

    /// Register a new user.
    ///
    /// The durable store's username constraint is the linearization point for
    /// concurrent registrations: the pre-check keeps the common case cheap,
    /// and a unique violation on insert maps to the same already-exists
    /// signal.
    ///
    /// # Errors
    ///
    /// Returns a validation error, the already-exists signal, or an internal
    /// error
    pub async fn register(&self, username: &str, password: &str) -> AppResult<()> {
        validate_username(username)?;
        validate_password(password)?;

        info!(username, "registering user");

        match self.storage.database().get_user(username).await {
            Ok(Some(_)) => {
                warn!(username, "registration for existing user");
                return Err(AppError::already_exists("user already exists"));
            }
            Ok(None) => {}
            Err(e) => return Err(e.into()),
        }

        let pass_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::internal(format!("failed to hash password: {e}")))?;

        match self.storage.database().save_user(username, &pass_hash).await {
            Ok(()) => {
                info!(username, "user registered");
                Ok(())
            }
            Err(DatabaseError::UserExists) => {
                warn!(username, "registration lost the race to another insert");
                Err(AppError::already_exists("user already exists"))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Authenticate a user and mint a credential pair.
    ///
    /// # Errors
    ///
    /// Returns a validation error, the unified invalid-credentials signal, or
    /// an internal error
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        app_id: u32,
    ) -> AppResult<TokenPair> {
        Self::validate_data(username, password, app_id)?;

        info!(username, app_id, "attempting login");

        let user = self.storage.get_user(username, app_id).await?;

        match bcrypt::verify(password, &user.pass_hash) {
            Ok(true) => {}
            Ok(false) => {
                warn!(username, "password mismatch");
                return Err(AppError::invalid_credentials());
            }
            Err(e) => {
                return Err(AppError::internal(format!(
                    "password verification failed: {e}"
                )))
            }
        }

        let app = self.storage.get_app(app_id).await?;
        let key = self.jwks.active_private_key()?;
        let mut pair = self.auth_manager.generate_token_pair(&user, &app, &key)?;

        self.persist_refresh_token(user.id, app.id, &mut pair).await?;

        self.storage.save_user(&user, app_id).await;

        info!(username, app_id, "login succeeded");
        Ok(pair)
    }

    /// Persist the refresh token, regenerating on global-uniqueness
    /// collisions up to the attempt cap.
    async fn persist_refresh_token(
        &self,
        user_id: i64,
        app_id: u32,
        pair: &mut TokenPair,
    ) -> AppResult<()> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self
                .storage
                .database()
                .save_refresh_token(user_id, app_id, &pair.refresh_token)
                .await
            {
                Ok(()) => {
                    debug!(user_id, app_id, "refresh token stored");
                    return Ok(());
                }
                Err(DatabaseError::RefreshTokenExists)
                    if attempts < REFRESH_TOKEN_SAVE_ATTEMPTS =>
                {
                    debug!(
                        user_id,
                        app_id, attempts, "refresh token collision, regenerating"
                    );
                    pair.refresh_token = self.auth_manager.generate_refresh_token()?;
                }
                Err(DatabaseError::RefreshTokenExists) => {
                    return Err(AppError::internal(format!(
                        "refresh token collision not resolved after {attempts} attempts"
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Invalidate a session. Reserved on the wire surface.
    ///
    /// # Errors
    ///
    /// Always returns the unimplemented signal
    pub fn logout(&self, _token: &str) -> AppResult<bool> {
        Err(AppError::unimplemented("Logout"))
    }

    /// Check whether a user holds an admin role. Reserved on the wire surface.
    ///
    /// # Errors
    ///
    /// Always returns the unimplemented signal
    pub fn is_admin(&self, _username: &str) -> AppResult<bool> {
        Err(AppError::unimplemented("IsAdmin"))
    }

    /// Exchange a refresh token for a new pair. Reserved on the wire surface.
    ///
    /// # Errors
    ///
    /// Always returns the unimplemented signal
    pub fn refresh_token(&self, _token: &str) -> AppResult<TokenPair> {
        Err(AppError::unimplemented("RefreshToken"))
    }
}
