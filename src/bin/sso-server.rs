// ABOUTME: Server binary entry point
// ABOUTME: Loads configuration, initializes logging, and runs the service
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use anyhow::Result;

use sso_server::config::ServerConfig;
use sso_server::server;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env()?;
    config.logging.init()?;

    server::run(config).await
}
