//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::ValidationError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format (setup only; login folds this into
    /// `InvalidCredentials`).
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] redline_core::EmailError),

    /// Wrong password or no such account. The two are never distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Setup was attempted after the first account exists.
    #[error("setup has already been completed")]
    SetupClosed,

    /// Setup was attempted with an email other than `ADMIN_EMAIL`.
    #[error("setup must use the configured admin email")]
    NotAdminEmail,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Another setup field failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
