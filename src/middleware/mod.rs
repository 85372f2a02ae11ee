// ABOUTME: Request middleware for the SSO service
// ABOUTME: Hosts the HMAC application-authentication gate
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

/// HMAC application-authentication gate
pub mod app_auth;

pub use app_auth::AppAuthValidator;
