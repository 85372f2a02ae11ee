// ABOUTME: HMAC application-authentication gate validating the request envelope
// ABOUTME: Rejects requests outside the clock-skew window or with a bad signature
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Application-authentication middleware.
//!
//! Every authenticated request proves it originates from a registered
//! application by sending `(app_id, timestamp)` in its body and an
//! `authorization` header holding `HEX(HMAC-SHA256(app_secret,
//! timestamp + decimal(app_id)))`. The gate runs before any credential logic
//! and never mutates state on a negative outcome.
//!
//! All rejections share one wire status; an unknown application is
//! deliberately indistinguishable from a signature mismatch. The concrete
//! reason is only logged locally.

use chrono::{DateTime, Duration, Utc};
use ring::hmac;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::config::Mode;
use crate::constants::auth::{TIMESTAMP_MAX_AGE_SECS, TIMESTAMP_MAX_SKEW_SECS};
use crate::errors::{AppError, AppResult};
use crate::models::AuthMetadata;
use crate::storage::CachedStorage;

/// Shared wire message for every post-envelope rejection
const INVALID_DATA: &str = "invalid data transmitted";

/// Wire message for a missing or empty envelope
const UNAUTHENTICATED: &str = "unauthenticated";

/// Validates the per-request HMAC envelope before business logic runs
#[derive(Clone)]
pub struct AppAuthValidator {
    storage: CachedStorage,
    mode: Mode,
}

impl AppAuthValidator {
    /// Create a validator bound to the storage façade and deployment mode
    #[must_use]
    pub const fn new(storage: CachedStorage, mode: Mode) -> Self {
        Self { storage, mode }
    }

    /// Validate a request envelope.
    ///
    /// # Errors
    ///
    /// Every negative outcome maps to the unauthenticated wire status; the
    /// distinguishing reason is logged, not returned.
    pub async fn validate(
        &self,
        auth_header: Option<&str>,
        metadata: Option<&AuthMetadata>,
    ) -> AppResult<()> {
        if self.mode.bypasses_app_auth() {
            return Ok(());
        }

        let tag = match auth_header {
            Some(tag) if !tag.is_empty() => tag,
            _ => {
                warn!("request without authorization header");
                return Err(AppError::unauthenticated(UNAUTHENTICATED));
            }
        };

        let Some(metadata) = metadata else {
            warn!("request without authentication metadata");
            return Err(AppError::unauthenticated(UNAUTHENTICATED));
        };

        let ts = match DateTime::parse_from_rfc3339(&metadata.timestamp) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                warn!(
                    app_id = metadata.app_id,
                    timestamp = %metadata.timestamp,
                    error = %e,
                    "failed to parse request timestamp"
                );
                return Err(AppError::unauthenticated(INVALID_DATA));
            }
        };

        let now = Utc::now();
        if ts <= now - Duration::seconds(TIMESTAMP_MAX_AGE_SECS)
            || ts >= now + Duration::seconds(TIMESTAMP_MAX_SKEW_SECS)
        {
            warn!(
                app_id = metadata.app_id,
                timestamp = %metadata.timestamp,
                now = %now.to_rfc3339(),
                "request timestamp outside the accepted window"
            );
            return Err(AppError::unauthenticated(INVALID_DATA));
        }

        let app = match self.storage.get_app(metadata.app_id).await {
            Ok(app) => app,
            Err(e) => {
                warn!(app_id = metadata.app_id, error = %e, "app lookup failed");
                return Err(AppError::unauthenticated(INVALID_DATA));
            }
        };

        // The MAC covers the exact timestamp string the client sent
        let expected = compute_signature(&app.secret, &metadata.timestamp, metadata.app_id);
        let matches: bool = expected.as_bytes().ct_eq(tag.as_bytes()).into();
        if !matches {
            warn!(app_id = metadata.app_id, "HMAC mismatch");
            return Err(AppError::unauthenticated(INVALID_DATA));
        }

        debug!(
            app_id = metadata.app_id,
            timestamp = %metadata.timestamp,
            "HMAC validated"
        );
        Ok(())
    }
}

/// Compute the lowercase-hex HMAC-SHA256 tag over
/// `timestamp + decimal(app_id)`
#[must_use]
pub fn compute_signature(secret: &str, timestamp: &str, app_id: u32) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let tag = hmac::sign(&key, format!("{timestamp}{app_id}").as_bytes());
    hex::encode(tag.as_ref())
}
