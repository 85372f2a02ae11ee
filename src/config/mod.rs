// ABOUTME: Configuration module for environment-driven settings
// ABOUTME: Re-exports the server configuration types
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

/// Environment-based configuration loading
pub mod environment;

pub use environment::{AuthConfig, DatabaseConfig, Mode, ServerConfig};
