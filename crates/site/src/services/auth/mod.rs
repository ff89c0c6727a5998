//! Authentication service.
//!
//! Password login against the `users` table, opaque-token sessions, and the
//! one-time setup flow that creates the first account.

mod error;
pub mod password;
mod session;

pub use error::AuthError;
pub use session::SessionStore;

use redline_core::{Email, UserRole};
use sqlx::PgPool;

use crate::db::RepositoryError;
use crate::db::users::{self, UserRepository};
use crate::models::{User, bounded_text};
use password::{
    dummy_verify, hash_password_blocking, validate_password, verify_password_blocking,
};

/// Authentication service.
///
/// Handles login, first-account setup, and password upgrades.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            users: UserRepository::new(pool),
        }
    }

    /// Login with email and password.
    ///
    /// Unknown accounts, malformed emails and wrong passwords all fail with
    /// the same error after the same amount of hashing work. A successful
    /// login against a legacy bcrypt hash upgrades it to Argon2id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let account = match Email::parse(email) {
            Ok(email) => self.users.get_with_password(&email).await?,
            Err(_) => None,
        };

        let Some((user, stored)) = account else {
            dummy_verify(password.to_owned()).await;
            return Err(AuthError::InvalidCredentials);
        };

        let scheme = stored.scheme;
        verify_password_blocking(password.to_owned(), stored).await?;

        if scheme.needs_rehash() {
            self.upgrade_password(&user, password).await;
        }

        tracing::info!(user_id = %user.id, "login succeeded");
        Ok(user)
    }

    /// Whether setup is still possible (no account exists yet).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the count fails.
    pub async fn is_setup_open(&self) -> Result<bool, AuthError> {
        Ok(self.users.count().await? == 0)
    }

    /// Create the first account.
    ///
    /// Refused with `SetupClosed` as soon as any account exists, before the
    /// payload is even looked at. The count and insert run under an advisory
    /// lock in one transaction, so concurrent attempts create at most one
    /// account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SetupClosed` if an account already exists.
    /// Returns `AuthError::NotAdminEmail` if `email` is not the configured
    /// operator address. Returns `AuthError::InvalidEmail`,
    /// `AuthError::WeakPassword` or `AuthError::Validation` for a bad payload.
    pub async fn setup(
        &self,
        email: &str,
        password: &str,
        name: &str,
        admin_email: &Email,
    ) -> Result<User, AuthError> {
        if !self.is_setup_open().await? {
            return Err(AuthError::SetupClosed);
        }

        let (email, name) = validate_setup(email, password, name, admin_email)?;
        let stored = hash_password_blocking(password.to_owned()).await?;

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        users::lock_for_setup(&mut *tx).await?;
        if users::count_in(&mut *tx).await? > 0 {
            return Err(AuthError::SetupClosed);
        }
        let user = users::insert_in(&mut *tx, &email, &name, UserRole::Admin, &stored).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(user_id = %user.id, "initial account created");
        Ok(user)
    }

    async fn upgrade_password(&self, user: &User, password: &str) {
        let result = match hash_password_blocking(password.to_owned()).await {
            Ok(upgraded) => self
                .users
                .update_password(user.id, &upgraded)
                .await
                .map_err(AuthError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => tracing::info!(user_id = %user.id, "upgraded legacy password hash"),
            Err(e) => tracing::warn!(user_id = %user.id, error = %e, "password rehash failed"),
        }
    }
}

/// Check a setup payload without touching the database.
///
/// The first account is the operator account, so its email must match
/// `admin_email` (case-insensitive). Any other address would close setup
/// while leaving the site without an admin.
fn validate_setup(
    email: &str,
    password: &str,
    name: &str,
    admin_email: &Email,
) -> Result<(Email, String), AuthError> {
    let email = Email::parse(email)?;
    if !admin_email.matches(email.as_str()) {
        tracing::warn!("setup refused for an email other than ADMIN_EMAIL");
        return Err(AuthError::NotAdminEmail);
    }
    validate_password(password)?;
    let name = bounded_text("name", name, 1, 100)?;
    Ok((email, name))
}
