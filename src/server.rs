// ABOUTME: Server assembly and lifecycle: wiring, listening, graceful shutdown
// ABOUTME: Constructs every component from configuration and drains in-flight requests on exit
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::auth::AuthManager;
use crate::cache::factory::Cache;
use crate::config::ServerConfig;
use crate::constants::server::SHUTDOWN_GRACE_SECS;
use crate::database_plugins::factory::Database;
use crate::jwks::JwksManager;
use crate::middleware::AppAuthValidator;
use crate::routes;
use crate::services::AuthService;
use crate::storage::CachedStorage;

/// Shared state handed to every request handler
pub struct ServerResources {
    /// Registration/login orchestration
    pub auth_service: AuthService,
    /// HMAC application gate
    pub validator: AppAuthValidator,
    /// Signing-key manager
    pub jwks: Arc<JwksManager>,
    /// Storage façade
    pub storage: CachedStorage,
    /// Immutable configuration
    pub config: ServerConfig,
}

impl ServerResources {
    /// Construct every component from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database, cache, or key manager fails to
    /// initialize
    pub async fn new(config: ServerConfig) -> Result<Self> {
        Self::with_key_size(config, crate::constants::keys::RSA_KEY_SIZE).await
    }

    /// Construct with a configurable RSA modulus size.
    ///
    /// Smaller sizes exist for test execution speed; production callers go
    /// through [`Self::new`].
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::new`].
    pub async fn with_key_size(config: ServerConfig, key_size: usize) -> Result<Self> {
        let database = Database::new(&config.database.url)
            .await
            .context("failed to open database")?;
        database.migrate().await.context("failed to run schema migration")?;

        let cache = Cache::new(config.cache.clone())
            .await
            .context("failed to initialize cache")?;

        let storage = CachedStorage::new(database, cache, config.cache.token_ttl);
        let jwks = Arc::new(JwksManager::with_key_size(&config.auth, key_size)?);
        let auth_manager =
            AuthManager::new(config.auth.token_ttl, config.auth.refresh_token_ttl);
        let auth_service = AuthService::new(storage.clone(), Arc::clone(&jwks), auth_manager);
        let validator = AppAuthValidator::new(storage.clone(), config.mode);

        Ok(Self {
            auth_service,
            validator,
            jwks,
            storage,
            config,
        })
    }
}

/// Run the server until a shutdown signal arrives, then drain and close.
///
/// # Errors
///
/// Returns an error if startup fails; runtime serve errors are logged
pub async fn run(config: ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.http_port);
    let resources = Arc::new(ServerResources::new(config).await?);
    let app = routes::router(Arc::clone(&resources));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, mode = ?resources.config.mode, "server listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut serve_task = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .into_future(),
    );

    tokio::select! {
        () = shutdown_signal() => {
            info!("shutdown signal received, draining in-flight requests");
            let _ = shutdown_tx.send(());
            match timeout(Duration::from_secs(SHUTDOWN_GRACE_SECS), &mut serve_task).await {
                Ok(Ok(Ok(()))) => info!("server drained"),
                Ok(Ok(Err(e))) => error!(error = %e, "server error during drain"),
                Ok(Err(e)) => error!(error = %e, "server task failed"),
                Err(_) => {
                    warn!("grace period elapsed, aborting remaining requests");
                    serve_task.abort();
                }
            }
        }
        result = &mut serve_task => {
            match result {
                Ok(Ok(())) => info!("server stopped"),
                Ok(Err(e)) => error!(error = %e, "server error"),
                Err(e) => error!(error = %e, "server task failed"),
            }
        }
    }

    // Close errors are logged, never block shutdown
    resources.storage.database().close().await;
    if let Err(e) = resources.storage.cache().close().await {
        warn!(error = %e, "failed to close cache cleanly");
    }
    info!("shutdown complete");
    Ok(())
}

/// Resolve when SIGINT or SIGTERM arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
