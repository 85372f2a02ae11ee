// ABOUTME: Round-trip tests between token minting and the published key set
// ABOUTME: Verifies signatures against keys reconstructed from JWKS n/e components
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use serde_json::Value;
use sso_server::auth::AuthManager;
use sso_server::jwks::JsonWebKeySet;
use sso_server::models::{App, User, UserRole};

use common::{create_test_auth_manager, create_test_jwks};

fn test_user() -> User {
    User {
        id: 7,
        username: "alice".into(),
        pass_hash: "$2b$04$unused".into(),
        role: UserRole::Regular,
    }
}

fn test_app() -> App {
    App {
        id: 1,
        name: "web".into(),
        secret: "S".into(),
    }
}

#[test]
fn token_verifies_against_the_matching_key_set_entry() {
    let dir = tempfile::tempdir().unwrap();
    let jwks = create_test_jwks(dir.path());
    let minter = create_test_auth_manager();

    let key = jwks.active_private_key().unwrap();
    let token = minter
        .generate_access_token(&test_user(), &test_app(), &key)
        .unwrap();

    let entries = jwks.get_public_keys().unwrap();
    let entry = entries.iter().find(|e| e.kid == key.kid).unwrap();

    let claims = AuthManager::decode_access_token(&token.token, entry).unwrap();
    assert_eq!(claims.user_id, 7);
    assert_eq!(claims.username, "alice");
    assert_eq!(claims.kid, key.kid);
}

#[test]
fn rotation_mid_traffic_keeps_old_tokens_verifiable() {
    let dir = tempfile::tempdir().unwrap();
    let jwks = create_test_jwks(dir.path());
    let minter = create_test_auth_manager();

    // Issue a token, then rotate immediately
    let old_key = jwks.active_private_key().unwrap();
    let token = minter
        .generate_access_token(&test_user(), &test_app(), &old_key)
        .unwrap();
    let (rotated_old, rotated_new) = jwks.rotate_keys().unwrap();
    assert_eq!(rotated_old, old_key.kid);

    // The key set now lists both kids
    let entries = jwks.get_public_keys().unwrap();
    let kids: Vec<&str> = entries.iter().map(|e| e.kid.as_str()).collect();
    assert!(kids.contains(&rotated_old.as_str()));
    assert!(kids.contains(&rotated_new.as_str()));

    // The pre-rotation token still verifies against the retired key's entry
    let old_entry = entries.iter().find(|e| e.kid == rotated_old).unwrap();
    let claims = AuthManager::decode_access_token(&token.token, old_entry).unwrap();
    assert_eq!(claims.kid, rotated_old);

    // And fails against the new key
    let new_entry = entries.iter().find(|e| e.kid == rotated_new).unwrap();
    assert!(AuthManager::decode_access_token(&token.token, new_entry).is_err());
}

#[test]
fn key_set_serializes_in_the_standard_shape() {
    let dir = tempfile::tempdir().unwrap();
    let jwks = create_test_jwks(dir.path());

    let set = JsonWebKeySet {
        keys: jwks.get_public_keys().unwrap(),
    };
    let json: Value = serde_json::from_str(&serde_json::to_string(&set).unwrap()).unwrap();

    let keys = json.get("keys").unwrap().as_array().unwrap();
    assert_eq!(keys.len(), 1);

    let entry = keys[0].as_object().unwrap();
    assert_eq!(entry.get("kty").unwrap(), "RSA");
    assert_eq!(entry.get("alg").unwrap(), "RS256");
    assert_eq!(entry.get("use").unwrap(), "sig");
    assert!(entry.contains_key("kid"));

    // Raw-unpadded base64url components
    let n = entry.get("n").unwrap().as_str().unwrap();
    let e = entry.get("e").unwrap().as_str().unwrap();
    assert!(!n.contains('=') && !n.contains('+') && !n.contains('/'));
    assert!(!e.contains('=') && !e.contains('+') && !e.contains('/'));
}

#[test]
fn access_token_carries_kid_in_the_header() {
    let dir = tempfile::tempdir().unwrap();
    let jwks = create_test_jwks(dir.path());
    let minter = create_test_auth_manager();

    let key = jwks.active_private_key().unwrap();
    let token = minter
        .generate_access_token(&test_user(), &test_app(), &key)
        .unwrap();

    let header = jsonwebtoken::decode_header(&token.token).unwrap();
    assert_eq!(header.kid.as_deref(), Some(key.kid.as_str()));
    assert_eq!(header.alg, jsonwebtoken::Algorithm::RS256);
}
