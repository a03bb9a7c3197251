//! Password hashing for the credential store.
//!
//! This module provides:
//! - Argon2id hashing with a random per-user salt, stored as a PHC string
//! - Verification of both PHC hashes and legacy unsalted SHA-256 digests
//!
//! # Security
//!
//! - Uses Argon2id (memory-hard, resistant to GPU/ASIC attacks)
//! - Legacy digests are compared in constant time
//! - Unknown users still cost one hash computation (see [`dummy_verify`])

use std::sync::OnceLock;

use argon2::{
    password_hash::{self, PasswordHash, SaltString},
    Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version,
};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors during password hashing/verification.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Stored password hash has an unrecognized format")]
    InvalidFormat,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB
    pub m_cost: u32,
    /// Iterations
    pub t_cost: u32,
    /// Lanes
    pub p_cost: u32,
}

impl Default for HashParams {
    /// 46 MiB, one pass, one lane.
    fn default() -> Self {
        Self {
            m_cost: 47104,
            t_cost: 1,
            p_cost: 1,
        }
    }
}

impl HashParams {
    /// Smallest parameters argon2 accepts. Only for tests.
    #[must_use]
    pub fn insecure_fast() -> Self {
        Self {
            m_cost: Params::MIN_M_COST,
            t_cost: Params::MIN_T_COST,
            p_cost: Params::MIN_P_COST,
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>, CredentialError> {
        let params = Params::new(self.m_cost, self.t_cost, self.p_cost, None)
            .map_err(|e| CredentialError::Hashing(format!("Invalid Argon2 params: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Generate a random salt for Argon2id.
#[must_use]
pub fn generate_salt() -> SaltString {
    SaltString::generate(&mut OsRng)
}

/// Hash a password with a fresh random salt.
///
/// # Errors
/// Returns error if hashing fails.
pub fn hash_password(password: &str, params: &HashParams) -> Result<String, CredentialError> {
    hash_password_with_salt(password, &generate_salt(), params)
}

/// Hash a password with the given salt. Deterministic for a fixed salt.
///
/// # Errors
/// Returns error if hashing fails.
pub fn hash_password_with_salt(
    password: &str,
    salt: &SaltString,
    params: &HashParams,
) -> Result<String, CredentialError> {
    let hash = params
        .argon2()?
        .hash_password(password.as_bytes(), salt)
        .map_err(|e| CredentialError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Unsalted SHA-256 hex digest, the format older user tables hold.
#[must_use]
pub fn legacy_sha256_hex(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn is_legacy_digest(stored: &str) -> bool {
    stored.len() == 64 && stored.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Check a password against a stored hash.
///
/// Accepts PHC strings (`$argon2id$...`) and legacy SHA-256 hex digests.
///
/// # Errors
/// Returns `InvalidFormat` if the stored value is neither.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CredentialError> {
    if is_legacy_digest(stored) {
        let candidate = legacy_sha256_hex(password);
        return Ok(constant_time_eq_str(&candidate, &stored.to_ascii_lowercase()));
    }

    let parsed = PasswordHash::new(stored).map_err(|_| CredentialError::InvalidFormat)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CredentialError::Hashing(e.to_string())),
    }
}

/// Whether a stored hash should be rewritten with the current scheme.
#[must_use]
pub fn needs_rehash(stored: &str) -> bool {
    is_legacy_digest(stored)
}

/// Spend one verification on a fixed hash and discard the result.
///
/// Called when the username does not exist so the response time matches
/// a real verification.
pub fn dummy_verify(password: &str, params: &HashParams) {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    let dummy = DUMMY.get_or_init(|| hash_password("sleepinsight-dummy", params).ok());
    if let Some(hash) = dummy {
        let _ = verify_password(password, hash);
    }
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
