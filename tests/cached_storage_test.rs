// ABOUTME: Tests for the read-through/write-through storage façade
// ABOUTME: Covers cache-first ordering, durable fallback, and plaintext hygiene
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use serde_json::Value;
use sso_server::cache::CacheKey;
use sso_server::errors::ErrorCode;
use sso_server::models::{User, UserRole};

use common::{create_test_storage, seed_app, seed_user};

#[tokio::test]
async fn durable_hit_populates_the_cache() {
    let storage = create_test_storage().await;
    seed_user(&storage, "alice", "hunter22").await;

    let user = storage.get_user("alice", 1).await.unwrap();
    assert_eq!(user.username, "alice");

    let cached: Option<User> = storage
        .cache()
        .get(&CacheKey::User {
            app_id: 1,
            username: "alice".into(),
        })
        .await
        .unwrap();
    assert_eq!(cached.unwrap().id, user.id);
}

#[tokio::test]
async fn cache_entry_wins_over_the_durable_store() {
    let storage = create_test_storage().await;
    seed_user(&storage, "alice", "hunter22").await;

    // First lookup populates the cache
    let user = storage.get_user("alice", 1).await.unwrap();

    // Plant a marker record under the same key; a cache-first lookup must
    // return it instead of the durable row
    let marker = User {
        id: user.id,
        username: "alice".into(),
        pass_hash: "marker".into(),
        role: UserRole::Admin,
    };
    storage.save_user(&marker, 1).await;

    let got = storage.get_user("alice", 1).await.unwrap();
    assert_eq!(got.pass_hash, "marker");
    assert_eq!(got.role, UserRole::Admin);
}

#[tokio::test]
async fn user_cache_entries_are_scoped_per_app() {
    let storage = create_test_storage().await;
    seed_user(&storage, "alice", "hunter22").await;

    storage.get_user("alice", 1).await.unwrap();

    let other_app: Option<User> = storage
        .cache()
        .get(&CacheKey::User {
            app_id: 2,
            username: "alice".into(),
        })
        .await
        .unwrap();
    assert!(other_app.is_none());
}

#[tokio::test]
async fn cache_failure_degrades_to_the_durable_store() {
    let storage = create_test_storage().await;
    seed_user(&storage, "alice", "hunter22").await;

    // Poison the cache entry so the lookup fails to decode; the façade must
    // fall through to the durable store instead of surfacing the failure
    let key = CacheKey::User {
        app_id: 1,
        username: "alice".into(),
    };
    storage
        .cache()
        .set(&key, &"not a user record", None)
        .await
        .unwrap();

    let user = storage.get_user("alice", 1).await.unwrap();
    assert_eq!(user.username, "alice");

    // The fallback rewrote the entry with a decodable record
    let cached: Option<User> = storage.cache().get(&key).await.unwrap();
    assert_eq!(cached.unwrap().username, "alice");
}

#[tokio::test]
async fn durable_miss_is_the_unified_credentials_signal() {
    let storage = create_test_storage().await;

    let err = storage.get_user("ghost", 1).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidCredentials);

    let err = storage.get_app(42).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidCredentials);
}

#[tokio::test]
async fn cached_user_record_never_contains_a_plaintext_password() {
    let storage = create_test_storage().await;
    seed_user(&storage, "alice", "hunter22").await;
    storage.get_user("alice", 1).await.unwrap();

    let raw: Option<Value> = storage
        .cache()
        .get(&CacheKey::User {
            app_id: 1,
            username: "alice".into(),
        })
        .await
        .unwrap();
    let raw = raw.unwrap();

    let object = raw.as_object().unwrap();
    assert!(object.contains_key("pass_hash"));
    assert!(!object.contains_key("password"));
    assert!(!raw.to_string().contains("hunter22"));
}

#[tokio::test]
async fn app_lookup_round_trips_through_the_cache() {
    let storage = create_test_storage().await;
    seed_app(&storage, 7, "topsecret").await;

    let app = storage.get_app(7).await.unwrap();
    assert_eq!(app.secret, "topsecret");

    // Second read is served from cache: plant a marker to prove ordering
    let marker = sso_server::models::App {
        id: 7,
        name: "marker".into(),
        secret: "topsecret".into(),
    };
    storage.save_app(&marker).await;
    assert_eq!(storage.get_app(7).await.unwrap().name, "marker");
}
