// ABOUTME: Tests for the signing-key lifecycle manager
// ABOUTME: Covers load, stale-file cleanup, rotation, sweeps, and the non-empty guarantee
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::fs;
use std::path::Path;
use std::time::Duration;

use sso_server::config::AuthConfig;
use sso_server::jwks::JwksManager;
use uuid::Uuid;

use common::{create_test_jwks, test_auth_config, TEST_KEY_SIZE};

fn pem_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| {
            let path = e.unwrap().path();
            (path.extension().and_then(|x| x.to_str()) == Some("pem"))
                .then(|| path.file_name().unwrap().to_string_lossy().into_owned())
        })
        .collect();
    names.sort();
    names
}

#[test]
fn empty_directory_gets_a_fresh_pair() {
    let dir = tempfile::tempdir().unwrap();
    let manager = create_test_jwks(dir.path());

    let keys = manager.get_public_keys().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(pem_files(dir.path()).len(), 1);

    let active = manager.active_private_key().unwrap();
    assert_eq!(active.kid, keys[0].kid);
}

#[test]
fn restart_reloads_the_persisted_key() {
    let dir = tempfile::tempdir().unwrap();
    let first_kid = create_test_jwks(dir.path())
        .active_private_key()
        .unwrap()
        .kid;

    let manager = create_test_jwks(dir.path());
    assert_eq!(manager.active_private_key().unwrap().kid, first_kid);
    assert_eq!(manager.get_public_keys().unwrap().len(), 1);
}

#[test]
fn undecodable_pem_files_are_removed_at_load() {
    let dir = tempfile::tempdir().unwrap();
    // Valid v7 filename, garbage contents
    let bogus_id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
    fs::write(dir.path().join(format!("{bogus_id}.pem")), "not a key").unwrap();
    // Non-UUID filename
    fs::write(dir.path().join("not-a-uuid.pem"), "also not a key").unwrap();
    // Unrelated file is left alone
    fs::write(dir.path().join("README.txt"), "hello").unwrap();

    let manager = create_test_jwks(dir.path());
    let keys = manager.get_public_keys().unwrap();
    assert_eq!(keys.len(), 1);

    let files = pem_files(dir.path());
    assert_eq!(files.len(), 1, "bad pem files should be deleted: {files:?}");
    assert!(dir.path().join("README.txt").exists());
}

#[test]
fn stale_key_files_are_removed_at_load() {
    let dir = tempfile::tempdir().unwrap();

    // Generate a real key, then rename its file to a UUIDv7 whose embedded
    // timestamp is far enough in the past that the extended window is over
    let manager = create_test_jwks(dir.path());
    let live_kid = manager.active_private_key().unwrap().kid;
    drop(manager);

    let key_ttl_secs = common::TEST_KEY_TTL.as_secs();
    let token_ttl_secs = common::TEST_TOKEN_TTL.as_secs();
    let stale_secs = chrono::Utc::now().timestamp() as u64 - (key_ttl_secs + token_ttl_secs + 60);
    let stale_id = Uuid::new_v7(uuid::Timestamp::from_unix(
        uuid::NoContext,
        stale_secs,
        0,
    ));

    let live_path = dir.path().join(format!("{live_kid}.pem"));
    let stale_path = dir.path().join(format!("{stale_id}.pem"));
    fs::copy(&live_path, &stale_path).unwrap();

    let manager = create_test_jwks(dir.path());
    let keys = manager.get_public_keys().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].kid, live_kid);
    assert!(!stale_path.exists(), "stale pem should be deleted");
}

#[test]
fn rotation_keeps_the_old_public_key_published() {
    let dir = tempfile::tempdir().unwrap();
    let manager = create_test_jwks(dir.path());

    let before = manager.active_private_key().unwrap().kid;
    let (old, new) = manager.rotate_keys().unwrap();
    assert_eq!(old, before);
    assert_ne!(old, new);

    assert_eq!(manager.active_private_key().unwrap().kid, new);

    let kids: Vec<String> = manager
        .get_public_keys()
        .unwrap()
        .into_iter()
        .map(|k| k.kid)
        .collect();
    assert!(kids.contains(&old));
    assert!(kids.contains(&new));
    assert_eq!(pem_files(dir.path()).len(), 2);
}

#[test]
fn expired_active_key_rotates_on_demand() {
    let dir = tempfile::tempdir().unwrap();
    let config = AuthConfig {
        key_ttl: Duration::from_millis(200),
        ..test_auth_config(dir.path())
    };
    let manager = JwksManager::with_key_size(&config, TEST_KEY_SIZE).unwrap();

    let first = manager.active_private_key().unwrap().kid;
    std::thread::sleep(Duration::from_millis(400));

    let second = manager.active_private_key().unwrap();
    assert_ne!(second.kid, first);
    assert!(!second.is_expired());

    // The retired key's public half stays for its extended window
    let kids: Vec<String> = manager
        .get_public_keys()
        .unwrap()
        .into_iter()
        .map(|k| k.kid)
        .collect();
    assert!(kids.contains(&first));
    assert!(kids.contains(&second.kid));
}

#[test]
fn sweep_drops_keys_past_the_extended_window_and_never_returns_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = AuthConfig {
        key_ttl: Duration::from_millis(200),
        token_ttl: Duration::from_millis(200),
        ..test_auth_config(dir.path())
    };
    let manager = JwksManager::with_key_size(&config, TEST_KEY_SIZE).unwrap();

    let first = manager.active_private_key().unwrap().kid;
    std::thread::sleep(Duration::from_millis(600));

    // The only key is past key_ttl + token_ttl: the sweep removes it and a
    // replacement is generated before returning
    let keys = manager.get_public_keys().unwrap();
    assert_eq!(keys.len(), 1);
    assert_ne!(keys[0].kid, first);

    let files = pem_files(dir.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with(&keys[0].kid));
}
