// ABOUTME: JWKS module exposing RSA signing-key lifecycle and key-set projection
// ABOUTME: Provides RS256 key generation, PEM persistence, rotation, and public key distribution
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! JWKS (JSON Web Key Set) Management
//!
//! This module provides:
//! - RSA key pair generation for RS256 access-token signing
//! - PEM persistence of private keys in an owner-only key directory
//! - Automatic rotation when the active key expires
//! - Public key distribution via the standard JWKS JSON shape
//!
//! ## Security Model
//!
//! - Private keys never leave the server
//! - Public keys are distributed via `/.well-known/jwks.json`
//! - A retired key's public half stays published for `key_ttl + token_ttl`
//!   past its creation, so tokens signed just before retirement remain
//!   verifiable until they expire themselves

pub mod keys;
pub mod manager;

pub use keys::RsaKeyPair;
pub use manager::JwksManager;

use serde::{Deserialize, Serialize};

/// JWK (JSON Web Key) representation for the key-set endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key ID (the signing key's UUIDv7)
    pub kid: String,
    /// Key type (always "RSA")
    pub kty: String,
    /// Algorithm (always "RS256")
    pub alg: String,
    /// Public key use (always "sig")
    #[serde(rename = "use")]
    pub key_use: String,
    /// RSA modulus, base64url without padding, big-endian minimal bytes
    pub n: String,
    /// RSA public exponent, base64url without padding, big-endian minimal bytes
    pub e: String,
}

/// JWKS (JSON Web Key Set) container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// Array of public keys
    pub keys: Vec<JsonWebKey>,
}
