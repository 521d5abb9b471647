//! auth key hashing for owner and service keys.
//!
//! raw keys are never stored: the database holds the hex-encoded SHA-256 of
//! the raw key, and verification compares digests in constant time.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// hash a raw auth key for storage (hex-encoded SHA-256).
pub fn hash_auth_key(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// verify a raw key against a stored hash using constant-time comparison.
pub fn verify_auth_key(raw: &str, stored_hash: &str) -> bool {
    let Ok(expected) = hex::decode(stored_hash) else {
        return false;
    };
    let provided = Sha256::digest(raw.as_bytes());
    provided.ct_eq(&expected[..]).into()
}
