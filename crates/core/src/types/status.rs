//! Status enums for moderated content and accounts.

use serde::{Deserialize, Serialize};

/// Moderation status of a visitor comment.
///
/// `approved` on a comment is derived from this value: it is true exactly when
/// the status is [`CommentStatus::Approved`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "comment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentStatus {
    /// Awaiting review. Every new submission starts here or in `Spam`.
    #[default]
    Pending,
    /// Visible on the public blog (if the post is published).
    Approved,
    /// Reviewed and hidden.
    Rejected,
    /// Classified or marked as spam.
    Spam,
}

impl CommentStatus {
    /// Whether a comment in this status counts as approved.
    #[must_use]
    pub const fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl std::fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Spam => write!(f, "SPAM"),
        }
    }
}

impl std::str::FromStr for CommentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "SPAM" => Ok(Self::Spam),
            _ => Err(format!("invalid comment status: {s}")),
        }
    }
}

/// Account role.
///
/// Admin access is decided by the configured admin email, not by this value;
/// the role is recorded for display and auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Admin,
    Editor,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Editor => write!(f, "editor"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// Format of a stored password hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "password_scheme", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PasswordScheme {
    /// Argon2id PHC string. All new hashes use this scheme.
    #[default]
    Argon2id,
    /// Legacy bcrypt hash, upgraded to Argon2id on the next successful login.
    Bcrypt,
}

impl PasswordScheme {
    /// Whether hashes in this scheme should be upgraded after verification.
    #[must_use]
    pub const fn needs_rehash(self) -> bool {
        matches!(self, Self::Bcrypt)
    }
}

impl std::fmt::Display for PasswordScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Argon2id => write!(f, "argon2id"),
            Self::Bcrypt => write!(f, "bcrypt"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_status_serde_uses_upper_case() {
        let json = serde_json::to_string(&CommentStatus::Approved).unwrap();
        assert_eq!(json, "\"APPROVED\"");
        let parsed: CommentStatus = serde_json::from_str("\"SPAM\"").unwrap();
        assert_eq!(parsed, CommentStatus::Spam);
        assert!(serde_json::from_str::<CommentStatus>("\"approved\"").is_err());
    }

    #[test]
    fn test_comment_status_from_str_round_trips_display() {
        for status in [
            CommentStatus::Pending,
            CommentStatus::Approved,
            CommentStatus::Rejected,
            CommentStatus::Spam,
        ] {
            assert_eq!(status.to_string().parse::<CommentStatus>().unwrap(), status);
        }
        assert!("maybe".parse::<CommentStatus>().is_err());
    }

    #[test]
    fn test_only_approved_is_approved() {
        assert!(CommentStatus::Approved.is_approved());
        assert!(!CommentStatus::Pending.is_approved());
        assert!(!CommentStatus::Rejected.is_approved());
        assert!(!CommentStatus::Spam.is_approved());
    }

    #[test]
    fn test_password_scheme_rehash() {
        assert!(PasswordScheme::Bcrypt.needs_rehash());
        assert!(!PasswordScheme::Argon2id.needs_rehash());
    }
}
