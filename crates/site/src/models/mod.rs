//! Domain models for the site.
//!
//! Request bodies are parsed into these validated types at the route boundary;
//! services and repositories only ever see data that already passed validation.

pub mod comment;
pub mod message;
pub mod post;
pub mod session;
pub mod subscriber;
pub mod user;

pub use comment::{Comment, ModerationCommand, NewComment, PublicComment};
pub use message::{ContactMessage, NewContactMessage};
pub use post::{NewPost, Post, PostFields, PostImage, PostSummary, PostUpdate};
pub use session::{CurrentUser, Session, SessionToken};
pub use subscriber::Subscriber;
pub use user::{StoredPassword, User};

use thiserror::Error;

/// A request field failed validation.
///
/// The message is safe to echo back to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{0} is not a valid email address")]
    InvalidEmail(&'static str),
    #[error("{0}")]
    Invalid(String),
}

/// Trim `value` and check its length in characters.
///
/// # Errors
///
/// Returns a [`ValidationError`] when the trimmed value is empty (and `min` is
/// non-zero) or falls outside `min..=max`.
pub fn bounded_text(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();

    if len == 0 && min > 0 {
        return Err(ValidationError::Required(field));
    }
    if len < min {
        return Err(ValidationError::TooShort { field, min });
    }
    if len > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_owned())
}

/// Like [`bounded_text`], but blank input becomes `None`.
///
/// # Errors
///
/// Returns [`ValidationError::TooLong`] when the trimmed value exceeds `max`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => bounded_text(field, v, 1, max).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_text_trims_and_counts_chars() {
        assert_eq!(bounded_text("name", "  Bob  ", 1, 3), Ok("Bob".to_string()));
        assert_eq!(bounded_text("name", "ééé", 1, 3), Ok("ééé".to_string()));
    }

    #[test]
    fn test_bounded_text_errors() {
        assert_eq!(
            bounded_text("name", "   ", 1, 100),
            Err(ValidationError::Required("name"))
        );
        assert_eq!(
            bounded_text("content", "short", 10, 2000),
            Err(ValidationError::TooShort {
                field: "content",
                min: 10
            })
        );
        assert_eq!(
            bounded_text("name", "abcd", 1, 3),
            Err(ValidationError::TooLong {
                field: "name",
                max: 3
            })
        );
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("excerpt", None, 10), Ok(None));
        assert_eq!(optional_text("excerpt", Some("   "), 10), Ok(None));
        assert_eq!(
            optional_text("excerpt", Some(" hi "), 10),
            Ok(Some("hi".to_string()))
        );
        assert!(optional_text("excerpt", Some("way too long"), 3).is_err());
    }
}
