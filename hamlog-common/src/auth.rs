//! Credential hashing and bearer token primitives
//!
//! # Architecture
//!
//! - Passwords: random 16-byte salt, SHA-256 stretched over
//!   [`PASSWORD_HASH_ROUNDS`] rounds, stored as hex alongside the hex salt
//! - Bearer tokens: 32 random bytes, hex encoded, handed to the client once;
//!   only the SHA-256 of a token is persisted
//! - Comparisons of secrets are constant-time
//!
//! # Pure Functions
//!
//! This module contains ONLY pure functions. Persistence of users and tokens
//! lives in the server's repository layer.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// SHA-256 stretching rounds applied to salted passwords
pub const PASSWORD_HASH_ROUNDS: u32 = 10_000;

/// Minimum accepted password length (characters)
pub const MIN_PASSWORD_LEN: usize = 8;

/// Salt length in bytes
const SALT_LEN: usize = 16;

/// Bearer token length in bytes
const TOKEN_LEN: usize = 32;

/// Salted password hash ready for storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    /// 64 hex characters
    pub hash: String,
    /// 32 hex characters
    pub salt: String,
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> PasswordHash {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = to_hex(&salt);
    let hash = hash_with_salt(password, &salt);
    PasswordHash { hash, salt }
}

/// Derive the stored hash for `password` under an existing hex `salt`
///
/// # Algorithm
///
/// 1. `digest = SHA-256(salt || password)`
/// 2. Repeat `ROUNDS - 1` times: `digest = SHA-256(digest || salt || password)`
/// 3. Return as 64 hex characters
pub fn hash_with_salt(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let mut digest = hasher.finalize();

    for _ in 1..PASSWORD_HASH_ROUNDS {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        digest = hasher.finalize();
    }

    format!("{:x}", digest)
}

/// Check a password against a stored hash/salt pair
///
/// # Examples
///
/// ```
/// use hamlog_common::auth::{hash_password, verify_password};
///
/// let stored = hash_password("hamradio1");
/// assert!(verify_password("hamradio1", &stored.hash, &stored.salt));
/// assert!(!verify_password("hamradio2", &stored.hash, &stored.salt));
/// ```
pub fn verify_password(password: &str, stored_hash: &str, salt: &str) -> bool {
    constant_time_eq(
        hash_with_salt(password, salt).as_bytes(),
        stored_hash.as_bytes(),
    )
}

/// Generate a new opaque bearer token (64 hex characters)
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_hex(&bytes)
}

/// Hash a bearer token for storage and lookup
pub fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Minimal shape check for an e-mail address used as a login name
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ========================================
// Tests
// ========================================
