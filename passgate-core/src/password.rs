//! Password hashing and verification
//!
//! Passwords are hashed with Argon2id using an explicit, per-credential
//! random salt of 256 bits. The salt is stored alongside the digest so a
//! verifier can recompute the digest for a candidate password and compare.
//!
//! A failed verification is a normal `false` result, never an error; only
//! salt generation and encoding problems surface as errors.

use argon2::{
    Argon2,
    PasswordHasher as _,
    password_hash::{Output, Salt, SaltString},
};
use chrono::{DateTime, Utc};
use rand::{TryRngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};

use crate::{Error, error::AuthError};

/// Salt length in bytes (256 bits).
const SALT_LEN: usize = 32;

/// A stored password credential. At most one credential per identity is
/// active at a time; superseded credentials may be retained inactive for
/// audit but are never validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCredential {
    pub hash: String,
    pub salt: String,
    pub changed_at: DateTime<Utc>,
    pub is_active: bool,
}

impl PasswordCredential {
    pub fn new(hash: String, salt: String) -> Self {
        Self {
            hash,
            salt,
            changed_at: Utc::now(),
            is_active: true,
        }
    }
}

/// Hashes and verifies passwords with Argon2id.
#[derive(Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a password with a fresh random salt.
    ///
    /// Returns the base64 digest and the base64 salt it was derived with.
    pub fn hash(&self, password: &str) -> Result<(String, String), Error> {
        let mut salt_bytes = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        let digest = self.digest(password, salt.as_salt())?;

        Ok((digest.to_string(), salt.to_string()))
    }

    /// Recompute the digest for `password` under `salt` and compare it to
    /// `hash`. Any malformed input yields `false` rather than an error.
    pub fn verify(&self, password: &str, hash: &str, salt: &str) -> bool {
        let Ok(expected) = Output::b64_decode(hash) else {
            return false;
        };
        let Ok(salt) = Salt::from_b64(salt) else {
            return false;
        };

        match self.digest(password, salt) {
            // Output equality is a constant-time comparison.
            Ok(actual) => actual == expected,
            Err(_) => false,
        }
    }

    fn digest(&self, password: &str, salt: Salt<'_>) -> Result<Output, Error> {
        let hashed = self
            .argon2
            .hash_password(password.as_bytes(), salt)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        hashed
            .hash
            .ok_or_else(|| AuthError::PasswordHash("digest missing from hash output".to_string()).into())
    }
}
