//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use redline_core::{Email, PasswordScheme, UserId, UserRole};
use serde::Serialize;

/// An administrative account (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored password hash together with the scheme that produced it.
///
/// Never serialized; only the authenticator reads it.
#[derive(Clone)]
pub struct StoredPassword {
    pub hash: String,
    pub scheme: PasswordScheme,
}

impl std::fmt::Debug for StoredPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredPassword")
            .field("hash", &"[REDACTED]")
            .field("scheme", &self.scheme)
            .finish()
    }
}
