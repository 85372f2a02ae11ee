// ABOUTME: Domain service layer for business logic extracted from route handlers
// ABOUTME: Provides protocol-agnostic authentication orchestration
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Domain service layer
//!
//! Business logic lives here, behind the transport. Handlers stay thin: they
//! run the application gate, delegate to a service, and map the result onto
//! the wire.

/// Registration and login orchestration
pub mod auth;

pub use auth::AuthService;
