// src/credentials.rs
//
// Password hashing. New hashes are bcrypt; verification also understands the
// passlib formats older accounts were stored with.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use hmac::{Hmac, Mac};
use log::warn;
use sha2::{Digest, Sha256};

use crate::error::ApiError;

const PBKDF2_SHA256_PREFIX: &str = "$pbkdf2-sha256$";
const BCRYPT_SHA256_PREFIX: &str = "$bcrypt-sha256$";
const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

/// Bcrypt salt (22 chars) followed by the checksum (31 chars).
const BCRYPT_SALT_LEN: usize = 22;
const BCRYPT_DIGEST_LEN: usize = 31;

#[derive(Clone, Copy, Debug)]
pub struct Credentials {
    cost: u32,
}

impl Credentials {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<String, ApiError> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| ApiError::Internal(format!("Error hashing password: {}", e)))
    }

    /// Never fails: a hash that cannot be parsed simply does not match.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let matched = if stored.starts_with(PBKDF2_SHA256_PREFIX) {
            verify_pbkdf2_sha256(password, stored)
        } else if stored.starts_with(BCRYPT_SHA256_PREFIX) {
            verify_bcrypt_sha256(password, stored)
        } else if BCRYPT_PREFIXES.iter().any(|p| stored.starts_with(p)) {
            bcrypt::verify(password, stored).ok()
        } else {
            None
        };
        matched.unwrap_or_else(|| {
            if !stored.is_empty() && !is_known_scheme(stored) {
                warn!("Password hash in unrecognised scheme");
            }
            false
        })
    }

    /// Whether a stored hash should be replaced by a fresh bcrypt hash.
    pub fn needs_rehash(&self, stored: &str) -> bool {
        !BCRYPT_PREFIXES.iter().any(|p| stored.starts_with(p))
    }
}

fn is_known_scheme(stored: &str) -> bool {
    stored.starts_with(PBKDF2_SHA256_PREFIX)
        || stored.starts_with(BCRYPT_SHA256_PREFIX)
        || BCRYPT_PREFIXES.iter().any(|p| stored.starts_with(p))
}

/// passlib "adapted base64": `.` instead of `+`, no padding.
fn ab64_decode(raw: &str) -> Option<Vec<u8>> {
    STANDARD_NO_PAD.decode(raw.replace('.', "+")).ok()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// `$pbkdf2-sha256$<rounds>$<salt>$<checksum>`
fn verify_pbkdf2_sha256(password: &str, stored: &str) -> Option<bool> {
    let mut parts = stored.strip_prefix(PBKDF2_SHA256_PREFIX)?.split('$');
    let rounds: u32 = parts.next()?.parse().ok()?;
    let salt = ab64_decode(parts.next()?)?;
    let expected = ab64_decode(parts.next()?)?;
    if parts.next().is_some() || rounds == 0 || expected.is_empty() {
        return None;
    }
    let mut derived = vec![0u8; expected.len()];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, rounds, &mut derived);
    Some(constant_time_eq(&derived, &expected))
}

/// Version 1: `$bcrypt-sha256$2a,<rounds>$<salt>$<digest>`, key = b64(sha256(pw)).
/// Version 2: `$bcrypt-sha256$v=2,t=2b,r=<rounds>$<salt>$<digest>`,
/// key = b64(hmac_sha256(key = salt, msg = pw)).
fn verify_bcrypt_sha256(password: &str, stored: &str) -> Option<bool> {
    let mut parts = stored.strip_prefix(BCRYPT_SHA256_PREFIX)?.split('$');
    let config = parts.next()?;
    let salt = parts.next()?;
    let digest = parts.next()?;
    if parts.next().is_some() || salt.len() != BCRYPT_SALT_LEN || digest.len() != BCRYPT_DIGEST_LEN {
        return None;
    }

    let (ident, rounds, key) = if let Some(params) = config.strip_prefix("v=2,") {
        let mut ident = None;
        let mut rounds = None;
        for param in params.split(',') {
            match param.split_once('=')? {
                ("t", value) => ident = Some(value),
                ("r", value) => rounds = value.parse::<u32>().ok(),
                _ => return None,
            }
        }
        let mut mac = Hmac::<Sha256>::new_from_slice(salt.as_bytes()).ok()?;
        mac.update(password.as_bytes());
        (ident?, rounds?, STANDARD.encode(mac.finalize().into_bytes()))
    } else {
        let (ident, rounds) = config.split_once(',')?;
        (ident, rounds.parse::<u32>().ok()?, STANDARD.encode(Sha256::digest(password.as_bytes())))
    };

    if !matches!(ident, "2a" | "2b") {
        return None;
    }
    let inner = format!("${}${:02}${}{}", ident, rounds, salt, digest);
    bcrypt::verify(key, &inner).ok()
}
