// ABOUTME: Main library entry point for the SSO authentication service
// ABOUTME: Issues RS256 access tokens and opaque refresh tokens for registered applications
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![deny(unsafe_code)]

//! # SSO Server
//!
//! A single sign-on authentication service for multiple registered client
//! applications. It authenticates end users with salted password hashes,
//! authorizes calling applications with a rotating HMAC-signed request
//! envelope, and publishes its signing keys as a JWKS so downstream services
//! can verify access tokens without contacting it.
//!
//! ## Architecture
//!
//! - **Application gate**: per-request HMAC envelope validation before any
//!   business logic
//! - **Auth service**: registration and login orchestration, bcrypt password
//!   verification, token minting, refresh-token persistence
//! - **Signing-key manager**: RSA key generation, PEM persistence, expiry,
//!   and race-free rotation
//! - **Cached storage**: read-through/write-through façade over the durable
//!   store and a self-healing Redis cache
//! - **Key-set publisher**: the public half of the signing material at
//!   `/.well-known/jwks.json`

/// Access and refresh token minting
pub mod auth;

/// Cache abstraction layer with pluggable backends
pub mod cache;

/// Configuration management
pub mod config;

/// Application constants and limits
pub mod constants;

/// Database abstraction layer with plugin support
pub mod database_plugins;

/// Unified error handling system with standard error codes
pub mod errors;

/// Signing-key lifecycle and key-set projection
pub mod jwks;

/// Production logging and structured output
pub mod logging;

/// Request middleware (the HMAC application gate)
pub mod middleware;

/// Common domain models
pub mod models;

/// HTTP route handlers
pub mod routes;

/// Server assembly and lifecycle
pub mod server;

/// Domain service layer
pub mod services;

/// Cached-storage façade
pub mod storage;
