// ABOUTME: Signing-key lifecycle manager owning the key directory and active key
// ABOUTME: Handles startup load, expiry sweeps, forced rotation, and key-set projection
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};

use super::keys::{KeyError, RsaKeyPair};
use super::JsonWebKey;
use crate::config::AuthConfig;
use crate::constants::keys::{PEM_EXTENSION, RSA_KEY_SIZE};
use crate::errors::{AppError, AppResult};

/// State guarded by the manager's lock: the active key id plus every key
/// whose public half is still published.
struct KeyRing {
    active_kid: String,
    keys: HashMap<String, RsaKeyPair>,
}

/// Owns the RSA key pairs used to sign access tokens and answers key-set
/// queries.
///
/// This is the only component that mutates the on-disk key directory. A
/// single reader/writer lock protects the active pointer and the key map;
/// writers hold it across generation and disk I/O, which is acceptable
/// because rotation and sweeps are infrequent and brief.
pub struct JwksManager {
    keys_dir: PathBuf,
    key_ttl: Duration,
    token_ttl: Duration,
    key_size: usize,
    inner: RwLock<KeyRing>,
}

impl JwksManager {
    /// Initialize the manager: ensure the key directory, load surviving PEM
    /// files, and generate a fresh pair if none survive.
    ///
    /// # Errors
    ///
    /// Key-directory I/O failures are fatal here and surfaced as
    /// "key manager initialization failed".
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        Self::with_key_size(config, RSA_KEY_SIZE)
    }

    /// Initialize with a configurable RSA modulus size.
    ///
    /// Smaller sizes exist for test execution speed; production callers go
    /// through [`Self::new`].
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::new`].
    pub fn with_key_size(config: &AuthConfig, key_size: usize) -> AppResult<Self> {
        let key_ttl = Duration::from_std(config.key_ttl)
            .map_err(|e| init_error(format!("key TTL out of range: {e}")))?;
        let token_ttl = Duration::from_std(config.token_ttl)
            .map_err(|e| init_error(format!("token TTL out of range: {e}")))?;

        ensure_keys_dir(&config.keys_dir)?;

        let manager = Self {
            keys_dir: config.keys_dir.clone(),
            key_ttl,
            token_ttl,
            key_size,
            inner: RwLock::new(KeyRing {
                active_kid: String::new(),
                keys: HashMap::new(),
            }),
        };

        let ring = manager.load_keys()?;
        info!(
            keys = ring.keys.len(),
            active = %ring.active_kid,
            dir = %manager.keys_dir.display(),
            "signing keys loaded"
        );
        *manager
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = ring;

        Ok(manager)
    }

    /// Get the active private key, rotating first if it has expired.
    ///
    /// # Errors
    ///
    /// Returns an error if rotation is needed and key generation fails
    pub fn active_private_key(&self) -> AppResult<RsaKeyPair> {
        {
            let ring = self
                .inner
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(key) = ring.keys.get(&ring.active_kid) {
                if !key.is_expired() {
                    return Ok(key.clone());
                }
            }
        }

        // Active key expired (or missing): rotate under the write lock.
        let mut ring = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Another caller may have rotated while we waited for the lock
        if let Some(key) = ring.keys.get(&ring.active_kid) {
            if !key.is_expired() {
                return Ok(key.clone());
            }
        }
        let pair = self.install_new_pair(&mut ring)?;
        info!(kid = %pair.kid, "active signing key expired, rotated");
        Ok(pair)
    }

    /// Sweep expired public keys, guarantee at least one pair exists, and
    /// project the survivors into key-set entries.
    ///
    /// # Errors
    ///
    /// Returns an error only if regeneration is needed and fails; filesystem
    /// errors during the sweep are logged and swallowed.
    pub fn get_public_keys(&self) -> AppResult<Vec<JsonWebKey>> {
        let mut ring = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        self.remove_expired_keys(&mut ring);

        if ring.keys.is_empty() {
            let pair = self.install_new_pair(&mut ring)?;
            debug!(kid = %pair.kid, "key ring was empty, generated a fresh pair");
        }

        Ok(ring.keys.values().map(RsaKeyPair::to_jwk).collect())
    }

    /// Force a rotation: generate a new pair and swap it in as active.
    ///
    /// The previous key's public half stays published for its extended
    /// window; its PEM file is removed by a later sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation or persistence fails
    pub fn rotate_keys(&self) -> AppResult<(String, String)> {
        let mut ring = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let old_kid = ring.active_kid.clone();
        let new_kid = self.install_new_pair(&mut ring)?.kid;
        info!(old = %old_kid, new = %new_kid, "signing keys rotated");
        Ok((old_kid, new_kid))
    }

    /// Scan the key directory, dropping stale or undecodable files.
    fn load_keys(&self) -> AppResult<KeyRing> {
        let entries = fs::read_dir(&self.keys_dir)
            .map_err(|e| init_error(format!("cannot read {}: {e}", self.keys_dir.display())))?;

        // (mtime, pair) for every survivor; newest file becomes active
        let mut survivors: Vec<(SystemTime, RsaKeyPair)> = Vec::new();

        for entry in entries {
            let entry = entry
                .map_err(|e| init_error(format!("cannot scan {}: {e}", self.keys_dir.display())))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PEM_EXTENSION) {
                continue;
            }

            match RsaKeyPair::load(&path, self.key_ttl, self.token_ttl) {
                Ok(pair) => {
                    let mtime = entry
                        .metadata()
                        .and_then(|m| m.modified())
                        .unwrap_or(SystemTime::UNIX_EPOCH);
                    survivors.push((mtime, pair));
                }
                Err(KeyError::Expired { ref kid }) => {
                    debug!(kid = %kid, "removing expired key file");
                    remove_key_file(&path);
                }
                Err(e) => {
                    error!(file = %path.display(), error = %e, "failed to decode key file");
                    remove_key_file(&path);
                }
            }
        }

        let mut ring = KeyRing {
            active_kid: String::new(),
            keys: HashMap::new(),
        };

        if survivors.is_empty() {
            self.install_new_pair(&mut ring)?;
            return Ok(ring);
        }

        survivors.sort_by(|a, b| b.0.cmp(&a.0));
        ring.active_kid = survivors[0].1.kid.clone();
        for (_, pair) in survivors {
            ring.keys.insert(pair.kid.clone(), pair);
        }
        Ok(ring)
    }

    /// Generate and persist a new pair, install it as active, and return a
    /// clone of it. Callers hold the write lock.
    fn install_new_pair(&self, ring: &mut KeyRing) -> AppResult<RsaKeyPair> {
        let pair = RsaKeyPair::generate_with_key_size(&self.keys_dir, self.key_ttl, self.key_size)
            .map_err(|e| AppError::internal(format!("failed to generate signing key: {e}")))?;
        ring.active_kid = pair.kid.clone();
        ring.keys.insert(pair.kid.clone(), pair.clone());
        Ok(pair)
    }

    /// Drop every key whose publication window has passed, deleting its PEM
    /// file best-effort. Callers hold the write lock.
    fn remove_expired_keys(&self, ring: &mut KeyRing) {
        let now = Utc::now();
        let expired: Vec<String> = ring
            .keys
            .values()
            .filter(|k| k.public_expires_at(self.token_ttl) <= now)
            .map(|k| k.kid.clone())
            .collect();

        for kid in expired {
            if let Some(pair) = ring.keys.remove(&kid) {
                debug!(kid = %kid, "removing expired public key");
                if let Err(e) = pair.delete_file() {
                    // The in-memory ring is already correct; a leftover file
                    // is cleaned up on the next load
                    warn!(kid = %kid, error = %e, "failed to remove key file");
                }
            }
        }
    }

}

fn init_error(detail: String) -> AppError {
    AppError::internal(format!("key manager initialization failed: {detail}"))
}

fn ensure_keys_dir(dir: &Path) -> AppResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .map_err(|e| init_error(format!("cannot create {}: {e}", dir.display())))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(
                dir,
                fs::Permissions::from_mode(crate::constants::keys::KEYS_DIR_MODE),
            )
            .map_err(|e| init_error(format!("cannot chmod {}: {e}", dir.display())))?;
        }
    }
    Ok(())
}

fn remove_key_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(file = %path.display(), error = %e, "failed to remove key file");
    }
}
