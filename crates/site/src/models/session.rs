//! Session-related types for cookie authentication.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use redline_core::{Email, UserId};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::User;

/// How long a session stays valid after login.
pub const SESSION_TTL: Duration = Duration::days(7);

/// Opaque bearer token handed to the browser in the session cookie.
///
/// 256 random bits, URL-safe base64. Only its SHA-256 digest is stored, so a
/// leaked sessions table cannot be replayed.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a new random token.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wrap a token received from a cookie.
    #[must_use]
    pub fn from_cookie(value: &str) -> Option<Self> {
        let value = value.trim();
        let plausible = !value.is_empty()
            && value.len() <= 128
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        plausible.then(|| Self(value.to_owned()))
    }

    /// The raw token for the cookie value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lookup key stored in the database.
    #[must_use]
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// A server-side session row.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Expired sessions must be treated as absent.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// The authenticated caller, as resolved from the session cookie.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub is_admin: bool,
}

impl CurrentUser {
    #[must_use]
    pub fn new(user: User, is_admin: bool) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            is_admin,
        }
    }
}
