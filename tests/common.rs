// ABOUTME: Shared helpers for integration tests
// ABOUTME: Builds in-memory storage, caches, key managers, and seeded fixtures
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sso_server::auth::AuthManager;
use sso_server::cache::{factory::Cache, CacheConfig};
use sso_server::config::AuthConfig;
use sso_server::database_plugins::factory::Database;
use sso_server::jwks::JwksManager;
use sso_server::models::App;
use sso_server::services::AuthService;
use sso_server::storage::CachedStorage;

/// RSA modulus for test keys; small for execution speed
pub const TEST_KEY_SIZE: usize = 2048;

pub const TEST_TOKEN_TTL: Duration = Duration::from_secs(3600);
pub const TEST_REFRESH_TTL: Duration = Duration::from_secs(604_800);
pub const TEST_KEY_TTL: Duration = Duration::from_secs(86_400);

/// Fresh in-memory database with the schema applied
pub async fn create_test_database() -> Database {
    let database = Database::new("sqlite::memory:").await.unwrap();
    database.migrate().await.unwrap();
    database
}

/// In-memory cache backend
pub async fn create_test_cache() -> Cache {
    Cache::new(CacheConfig {
        use_memory: true,
        token_ttl: TEST_TOKEN_TTL,
        ..CacheConfig::default()
    })
    .await
    .unwrap()
}

/// Storage façade over an in-memory database and cache
pub async fn create_test_storage() -> CachedStorage {
    CachedStorage::new(
        create_test_database().await,
        create_test_cache().await,
        TEST_TOKEN_TTL,
    )
}

/// Auth configuration pointing at the given key directory
pub fn test_auth_config(keys_dir: &Path) -> AuthConfig {
    AuthConfig {
        token_ttl: TEST_TOKEN_TTL,
        refresh_token_ttl: TEST_REFRESH_TTL,
        key_ttl: TEST_KEY_TTL,
        keys_dir: keys_dir.to_path_buf(),
    }
}

/// Key manager with test-sized keys in the given directory
pub fn create_test_jwks(keys_dir: &Path) -> JwksManager {
    JwksManager::with_key_size(&test_auth_config(keys_dir), TEST_KEY_SIZE).unwrap()
}

/// Token minter with the test lifetimes
pub fn create_test_auth_manager() -> AuthManager {
    AuthManager::new(TEST_TOKEN_TTL, TEST_REFRESH_TTL)
}

/// Full service over the given storage and key manager
pub fn create_auth_service(storage: CachedStorage, jwks: Arc<JwksManager>) -> AuthService {
    AuthService::new(storage, jwks, create_test_auth_manager())
}

/// Seed a registered application
pub async fn seed_app(storage: &CachedStorage, id: u32, secret: &str) -> App {
    let app = App {
        id,
        name: format!("app-{id}"),
        secret: secret.to_owned(),
    };
    storage.database().save_app(&app).await.unwrap();
    app
}

/// Seed a user with a bcrypt-hashed password, returning the user id
pub async fn seed_user(storage: &CachedStorage, username: &str, password: &str) -> i64 {
    let hash = bcrypt::hash(password, 4).unwrap();
    storage.database().save_user(username, &hash).await.unwrap();
    storage
        .database()
        .get_user(username)
        .await
        .unwrap()
        .unwrap()
        .id
}
