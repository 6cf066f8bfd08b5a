//! Prefixed random identifiers
//!
//! Identity ids are opaque strings of the form `usr_<random>` where the
//! random part carries at least 96 bits of entropy encoded as URL-safe
//! base64 without padding.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

/// Number of random bytes in a generated id (96 bits).
const ID_ENTROPY_BYTES: usize = 12;

/// Generate a prefixed id such as `usr_dGVzdHRlc3R0ZXN0`.
pub fn generate_prefixed_id(prefix: &str) -> String {
    let mut bytes = [0u8; ID_ENTROPY_BYTES];
    OsRng.try_fill_bytes(&mut bytes).unwrap();

    format!("{prefix}_{}", BASE64_URL_SAFE_NO_PAD.encode(bytes))
}

/// Check that an id consists of the expected prefix followed by at least
/// 96 bits of base64-encoded randomness.
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    let Some(random_part) = id
        .strip_prefix(expected_prefix)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };

    match BASE64_URL_SAFE_NO_PAD.decode(random_part) {
        Ok(decoded) => decoded.len() >= ID_ENTROPY_BYTES,
        Err(_) => false,
    }
}
