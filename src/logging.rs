// ABOUTME: Logging configuration and structured logging setup for observability
// ABOUTME: Configures tracing-subscriber with env-driven level and output format
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Production-ready logging configuration with structured output

use std::env;
use std::io;

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use crate::constants::server;

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for space-constrained environments
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (tracing `EnvFilter` syntax)
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Service name for structured logging
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            service_name: server::SERVICE_NAME.into(),
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());

        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        };

        Self {
            level,
            format,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| server::SERVICE_NAME.into()),
        }
    }

    /// Initialize the global tracing subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed
    pub fn init(&self) -> Result<()> {
        let env_filter = EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"));

        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .with_target(true);

        match self.format {
            LogFormat::Json => builder.json().try_init().map_err(anyhow::Error::msg)?,
            LogFormat::Pretty => builder.pretty().try_init().map_err(anyhow::Error::msg)?,
            LogFormat::Compact => builder.compact().try_init().map_err(anyhow::Error::msg)?,
        }

        tracing::info!(
            service = %self.service_name,
            level = %self.level,
            "logging initialized"
        );
        Ok(())
    }
}
