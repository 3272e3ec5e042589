//! Password hashing with Argon2id.
//!
//! Hashes are stored in PHC string format (`$argon2id$v=19$...`), which embeds
//! the salt and parameters, so verification needs nothing else.

use crate::error::{AuthError, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;

/// Hash a plaintext password with a fresh random salt.
///
/// # Errors
///
/// Returns [`AuthError::Crypto`] if the hasher fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Crypto(e.to_string()))
}

/// Check a plaintext password against a stored PHC hash.
///
/// # Errors
///
/// - [`AuthError::InvalidCredentials`] if the password does not match
/// - [`AuthError::MalformedHash`] if the stored hash cannot be parsed
pub fn verify_password(password: &str, stored_hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AuthError::MalformedHash(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|e| match e {
            argon2::password_hash::Error::Password => AuthError::InvalidCredentials,
            other => AuthError::Crypto(other.to_string()),
        })
}
