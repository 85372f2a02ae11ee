// ABOUTME: RSA key pair model with UUIDv7 identifiers and PKCS#1 PEM persistence
// ABOUTME: Handles generation, file round-trip, expiry windows, and JWK projection
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::EncodingKey;
use rand::rngs::OsRng;
use rsa::{
    pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, LineEnding},
    traits::PublicKeyParts,
    RsaPrivateKey, RsaPublicKey,
};
use thiserror::Error;
use uuid::Uuid;

use super::JsonWebKey;
use crate::constants::keys::{PEM_EXTENSION, RSA_KEY_SIZE};

/// Failures while generating or loading a signing key
#[derive(Debug, Error)]
pub enum KeyError {
    /// The derived public key's publication window has already passed
    #[error("public key expired for {kid}")]
    Expired {
        /// Key id of the stale key
        kid: String,
    },
    /// The filename is not a time-ordered UUID
    #[error("key filename is not a UUIDv7: {0}")]
    BadFilename(String),
    /// The PEM contents could not be parsed
    #[error("failed to parse private key PEM: {0}")]
    BadPem(#[from] rsa::pkcs1::Error),
    /// RSA key generation failed
    #[error("failed to generate RSA private key: {0}")]
    Generation(#[from] rsa::Error),
    /// The private key could not be turned into an RS256 signing key
    #[error("failed to build signing key for {kid}: {reason}")]
    Signing {
        /// Key id of the unusable key
        kid: String,
        /// Library error detail
        reason: String,
    },
    /// Filesystem failure
    #[error("key file I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// RSA key pair with lifecycle metadata.
///
/// The key id is a UUIDv7 whose embedded timestamp is the creation instant;
/// the pair is persisted as `<kid>.pem` (PKCS#1) in the key directory.
#[derive(Clone)]
pub struct RsaKeyPair {
    /// Unique key identifier (UUIDv7 string)
    pub kid: String,
    /// Private key for signing
    pub private_key: RsaPrivateKey,
    /// Public key for verification
    pub public_key: RsaPublicKey,
    /// Creation instant, taken from the UUIDv7 timestamp
    pub created_at: DateTime<Utc>,
    /// End of the active signing window (`created_at + key_ttl`)
    pub expires_at: DateTime<Utc>,
    /// Location of the persisted PEM file
    path: PathBuf,
}

impl RsaKeyPair {
    /// Generate a new pair with the production RSA-3072 modulus and persist it
    ///
    /// # Errors
    ///
    /// Returns an error if key generation or the PEM write fails
    pub fn generate(keys_dir: &Path, key_ttl: Duration) -> Result<Self, KeyError> {
        Self::generate_with_key_size(keys_dir, key_ttl, RSA_KEY_SIZE)
    }

    /// Generate a pair with a configurable modulus size and persist it.
    ///
    /// Smaller sizes exist for test execution speed; production callers go
    /// through [`Self::generate`].
    ///
    /// # Errors
    ///
    /// Returns an error if key generation or the PEM write fails
    pub fn generate_with_key_size(
        keys_dir: &Path,
        key_ttl: Duration,
        key_size_bits: usize,
    ) -> Result<Self, KeyError> {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, key_size_bits)?;
        let public_key = RsaPublicKey::from(&private_key);

        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let created_at = uuid_instant(&id)
            .ok_or_else(|| KeyError::BadFilename(id.to_string()))?;

        let pair = Self {
            kid: id.to_string(),
            private_key,
            public_key,
            created_at,
            expires_at: created_at + key_ttl,
            path: keys_dir.join(format!("{id}.{PEM_EXTENSION}")),
        };
        pair.save_to_file()?;
        Ok(pair)
    }

    /// Load a pair from `<kid>.pem`, validating the filename and the
    /// publication window.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Expired`] for keys whose extended window has
    /// passed, [`KeyError::BadFilename`] / [`KeyError::BadPem`] for
    /// undecodable files, and I/O errors otherwise.
    pub fn load(path: &Path, key_ttl: Duration, token_ttl: Duration) -> Result<Self, KeyError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| KeyError::BadFilename(path.display().to_string()))?;

        let id = Uuid::parse_str(stem)
            .map_err(|_| KeyError::BadFilename(stem.to_owned()))?;
        let created_at =
            uuid_instant(&id).ok_or_else(|| KeyError::BadFilename(stem.to_owned()))?;

        let pem = fs::read_to_string(path)?;
        let private_key = RsaPrivateKey::from_pkcs1_pem(&pem)?;
        let public_key = RsaPublicKey::from(&private_key);

        let pair = Self {
            kid: id.to_string(),
            private_key,
            public_key,
            created_at,
            expires_at: created_at + key_ttl,
            path: path.to_path_buf(),
        };

        if pair.public_expires_at(token_ttl) <= Utc::now() {
            return Err(KeyError::Expired { kid: pair.kid });
        }
        Ok(pair)
    }

    /// Whether the active signing window has ended
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// End of the public-key publication window (`expires_at + token_ttl`)
    #[must_use]
    pub fn public_expires_at(&self, token_ttl: Duration) -> DateTime<Utc> {
        self.expires_at + token_ttl
    }

    /// Convert the public half to JWK format
    #[must_use]
    pub fn to_jwk(&self) -> JsonWebKey {
        let n = self.public_key.n().to_bytes_be();
        let e = self.public_key.e().to_bytes_be();

        JsonWebKey {
            kid: self.kid.clone(),
            kty: "RSA".to_owned(),
            alg: "RS256".to_owned(),
            key_use: "sig".to_owned(),
            n: URL_SAFE_NO_PAD.encode(n),
            e: URL_SAFE_NO_PAD.encode(e),
        }
    }

    /// Get the encoding key for RS256 signing
    ///
    /// # Errors
    ///
    /// Returns an error if PEM export or encoding-key construction fails
    pub fn encoding_key(&self) -> Result<EncodingKey, KeyError> {
        let pem = self.private_key.to_pkcs1_pem(LineEnding::LF)?;
        EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| KeyError::Signing {
            kid: self.kid.clone(),
            reason: e.to_string(),
        })
    }

    /// Remove the persisted PEM file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed
    pub fn delete_file(&self) -> Result<(), KeyError> {
        fs::remove_file(&self.path)?;
        Ok(())
    }

    /// Path of the persisted PEM file
    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.path
    }

    fn save_to_file(&self) -> Result<(), KeyError> {
        let pem = self.private_key.to_pkcs1_pem(LineEnding::LF)?;

        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;

            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(crate::constants::keys::KEY_FILE_MODE)
                .open(&self.path)?;
            file.write_all(pem.as_bytes())?;
        }
        #[cfg(not(unix))]
        {
            fs::write(&self.path, pem.as_bytes())?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Private key material stays out of debug output
        f.debug_struct("RsaKeyPair")
            .field("kid", &self.kid)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Extract the creation instant embedded in a time-ordered UUID
fn uuid_instant(id: &Uuid) -> Option<DateTime<Utc>> {
    let ts = id.get_timestamp()?;
    let (secs, nanos) = ts.to_unix();
    DateTime::from_timestamp(i64::try_from(secs).ok()?, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY_SIZE: usize = 2048;

    #[test]
    fn generated_kid_is_a_time_ordered_uuid() {
        let dir = tempfile::tempdir().unwrap();
        let pair =
            RsaKeyPair::generate_with_key_size(dir.path(), Duration::hours(1), TEST_KEY_SIZE)
                .unwrap();

        let id = Uuid::parse_str(&pair.kid).unwrap();
        assert_eq!(id.get_version_num(), 7);
        assert!(pair.file_path().exists());

        let age = Utc::now() - pair.created_at;
        assert!(age.num_seconds().abs() < 10);
    }

    #[test]
    fn pem_round_trip_preserves_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let key_ttl = Duration::hours(1);
        let token_ttl = Duration::hours(1);
        let pair =
            RsaKeyPair::generate_with_key_size(dir.path(), key_ttl, TEST_KEY_SIZE).unwrap();

        let loaded = RsaKeyPair::load(pair.file_path(), key_ttl, token_ttl).unwrap();
        assert_eq!(loaded.kid, pair.kid);
        assert_eq!(loaded.public_key, pair.public_key);
        assert_eq!(loaded.created_at, pair.created_at);
    }

    #[test]
    fn load_rejects_non_uuid_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-uuid.pem");
        fs::write(&path, "garbage").unwrap();

        let err = RsaKeyPair::load(&path, Duration::hours(1), Duration::hours(1)).unwrap_err();
        assert!(matches!(err, KeyError::BadFilename(_)));
    }

    #[cfg(unix)]
    #[test]
    fn pem_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let pair =
            RsaKeyPair::generate_with_key_size(dir.path(), Duration::hours(1), TEST_KEY_SIZE)
                .unwrap();

        let mode = fs::metadata(pair.file_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn jwk_projection_uses_unpadded_base64url() {
        let dir = tempfile::tempdir().unwrap();
        let pair =
            RsaKeyPair::generate_with_key_size(dir.path(), Duration::hours(1), TEST_KEY_SIZE)
                .unwrap();

        let jwk = pair.to_jwk();
        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.alg, "RS256");
        assert_eq!(jwk.key_use, "sig");
        assert!(!jwk.n.contains('='));
        // 65537 == 0x010001 -> three big-endian bytes
        assert_eq!(URL_SAFE_NO_PAD.decode(&jwk.e).unwrap(), vec![1, 0, 1]);
    }
}
