//! Password hashing.
//!
//! Hashes are Argon2id PHC strings. The string embeds the salt and cost
//! parameters, so verification does not depend on the current
//! [`HashParams`].

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::config::HashParams;
use crate::error::{Error, PersistenceError, Result};

/// Hashes `password` with a fresh random salt.
pub(crate) fn hash_password(password: &str, params: HashParams) -> Result<String> {
    let params = Params::new(params.m_cost, params.t_cost, params.p_cost, None)
        .map_err(|e| Error::PasswordHash(format!("argon2 params: {e}")))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);
    argon
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// Checks `password` against a stored hash.
///
/// The digest comparison is constant-time.
pub(crate) fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| PersistenceError::CorruptRecord(format!("password hash: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PersistenceError::CorruptRecord(format!("password hash: {e}")).into()),
    }
}
