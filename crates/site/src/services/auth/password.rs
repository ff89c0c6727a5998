//! Password hashing and verification.
//!
//! New hashes are always Argon2id PHC strings. Accounts migrated from the old
//! site may still carry bcrypt hashes; those verify through the legacy path
//! and are re-hashed by the caller after a successful login.
//!
//! Both algorithms are deliberately slow, so the async wrappers run them on
//! the blocking thread pool.

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use redline_core::PasswordScheme;

use super::AuthError;
use crate::models::StoredPassword;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Verified against when the account does not exist, so unknown emails cost
/// the same as wrong passwords.
static DUMMY_HASH: LazyLock<StoredPassword> = LazyLock::new(|| StoredPassword {
    hash: hash_argon2("redline-dummy-password").unwrap_or_default(),
    scheme: PasswordScheme::Argon2id,
});

/// Check a candidate password against the creation rules.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password with the current scheme (Argon2id).
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<StoredPassword, AuthError> {
    Ok(StoredPassword {
        hash: hash_argon2(password)?,
        scheme: PasswordScheme::Argon2id,
    })
}

/// Verify a password against a stored hash, dispatching on its scheme.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or an unparseable hash.
pub fn verify_password(password: &str, stored: &StoredPassword) -> Result<(), AuthError> {
    let ok = match stored.scheme {
        PasswordScheme::Argon2id => verify_argon2(password, &stored.hash),
        PasswordScheme::Bcrypt => bcrypt::verify(password, &stored.hash).unwrap_or(false),
    };

    if ok {
        Ok(())
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

/// [`hash_password`] on the blocking pool.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails or the task panics.
pub async fn hash_password_blocking(password: String) -> Result<StoredPassword, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|_| AuthError::PasswordHash)?
}

/// [`verify_password`] on the blocking pool.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch, or
/// `AuthError::PasswordHash` if the task panics.
pub async fn verify_password_blocking(
    password: String,
    stored: StoredPassword,
) -> Result<(), AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|_| AuthError::PasswordHash)?
}

/// Burn one verification for an account that does not exist.
pub async fn dummy_verify(password: String) {
    let _ = verify_password_blocking(password, DUMMY_HASH.clone()).await;
}

fn hash_argon2(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

fn verify_argon2(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
