// ABOUTME: Tests for refresh-token persistence semantics
// ABOUTME: Covers per-pair upsert replacement and global uniqueness classification
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use sso_server::database_plugins::DatabaseError;
use sso_server::models::Token;

use common::{create_auth_service, create_test_jwks, create_test_storage, seed_app, seed_user};

fn token(value: &str) -> Token {
    Token {
        token: value.to_owned(),
        expires_at: chrono::Utc::now().timestamp() + 3600,
    }
}

#[tokio::test]
async fn upsert_replaces_the_row_for_the_same_pair() {
    let storage = create_test_storage().await;
    let user_id = seed_user(&storage, "alice", "hunter22").await;
    let db = storage.database();

    db.save_refresh_token(user_id, 1, &token("first")).await.unwrap();
    db.save_refresh_token(user_id, 1, &token("second")).await.unwrap();

    let row = db.get_refresh_token(user_id, 1).await.unwrap().unwrap();
    assert_eq!(row.token, "second");
}

#[tokio::test]
async fn the_same_user_can_hold_tokens_for_different_apps() {
    let storage = create_test_storage().await;
    let user_id = seed_user(&storage, "alice", "hunter22").await;
    let db = storage.database();

    db.save_refresh_token(user_id, 1, &token("for-app-1")).await.unwrap();
    db.save_refresh_token(user_id, 2, &token("for-app-2")).await.unwrap();

    assert_eq!(
        db.get_refresh_token(user_id, 1).await.unwrap().unwrap().token,
        "for-app-1"
    );
    assert_eq!(
        db.get_refresh_token(user_id, 2).await.unwrap().unwrap().token,
        "for-app-2"
    );
}

#[tokio::test]
async fn global_collision_is_a_distinct_domain_error() {
    let storage = create_test_storage().await;
    let alice = seed_user(&storage, "alice", "hunter22").await;
    let bob = seed_user(&storage, "bob", "hunter22").await;
    let db = storage.database();

    db.save_refresh_token(alice, 1, &token("shared")).await.unwrap();
    let err = db.save_refresh_token(bob, 1, &token("shared")).await.unwrap_err();
    assert!(matches!(err, DatabaseError::RefreshTokenExists));
}

#[tokio::test]
async fn delete_removes_only_a_matching_row() {
    let storage = create_test_storage().await;
    let user_id = seed_user(&storage, "alice", "hunter22").await;
    let db = storage.database();

    db.save_refresh_token(user_id, 1, &token("current")).await.unwrap();

    // A mismatched token string deletes nothing
    db.delete_refresh_token(user_id, 1, "stale").await.unwrap();
    assert!(db.get_refresh_token(user_id, 1).await.unwrap().is_some());

    db.delete_refresh_token(user_id, 1, "current").await.unwrap();
    assert!(db.get_refresh_token(user_id, 1).await.unwrap().is_none());
}

#[tokio::test]
async fn repeated_logins_replace_the_refresh_row() {
    let dir = tempfile::tempdir().unwrap();
    let storage = create_test_storage().await;
    let service = create_auth_service(storage.clone(), Arc::new(create_test_jwks(dir.path())));
    seed_app(&storage, 1, "S").await;
    let user_id = seed_user(&storage, "alice", "hunter22").await;

    let first = service.login("alice", "hunter22", 1).await.unwrap();
    let second = service.login("alice", "hunter22", 1).await.unwrap();

    // Both callers received distinct, valid refresh tokens
    assert_ne!(first.refresh_token.token, second.refresh_token.token);

    // The last writer owns the single row for the pair
    let row = storage
        .database()
        .get_refresh_token(user_id, 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.token, second.refresh_token.token);
    assert_eq!(row.expires_at, second.refresh_token.expires_at);
}
