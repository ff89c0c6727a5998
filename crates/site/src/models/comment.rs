//! Visitor comments and moderation commands.

use chrono::{DateTime, Utc};
use redline_core::{CommentId, CommentStatus, Email, PostId};
use serde::Serialize;

use super::{ValidationError, bounded_text};

pub const NAME_MAX: usize = 100;
pub const CONTENT_MIN: usize = 10;
pub const CONTENT_MAX: usize = 2000;

/// A stored comment as seen by the admin API.
///
/// `approved` always equals `status == Approved`.
#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub name: String,
    pub email: Option<Email>,
    pub content: String,
    pub status: CommentStatus,
    pub approved: bool,
    pub spam_score: f64,
    pub created_at: DateTime<Utc>,
}

/// The subset of a comment shown on the public blog.
#[derive(Debug, Clone, Serialize)]
pub struct PublicComment {
    pub id: CommentId,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for PublicComment {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            name: comment.name,
            content: comment.content,
            created_at: comment.created_at,
        }
    }
}

/// A validated public comment submission.
///
/// Content length is checked on the raw input, before classification or
/// sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: PostId,
    pub name: String,
    pub email: Option<Email>,
    pub content: String,
}

impl NewComment {
    /// Validate raw submission fields.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the name is missing or longer than 100
    /// characters, a non-blank email is malformed, or the content is outside
    /// 10-2000 characters.
    pub fn parse(
        post_id: PostId,
        name: &str,
        email: Option<&str>,
        content: &str,
    ) -> Result<Self, ValidationError> {
        let name = bounded_text("name", name, 1, NAME_MAX)?;
        let email = match email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(raw) => {
                Some(Email::parse(raw).map_err(|_| ValidationError::InvalidEmail("email"))?)
            }
            None => None,
        };
        let content = bounded_text("content", content, CONTENT_MIN, CONTENT_MAX)?;

        Ok(Self {
            post_id,
            name,
            email,
            content,
        })
    }
}

/// A normalized admin moderation action.
///
/// Built from the loosely-shaped `{approved?, status?}` request body so the
/// workflow only deals with a single target status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModerationCommand {
    status: CommentStatus,
}

impl ModerationCommand {
    #[must_use]
    pub const fn new(status: CommentStatus) -> Self {
        Self { status }
    }

    /// Normalize an `approved` flag and/or explicit status.
    ///
    /// An explicit status wins. A bare `approved: true` means `APPROVED`; a
    /// bare `approved: false` returns the comment to `PENDING`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when neither field is present or when the
    /// two disagree (e.g. `approved: true` with `status: SPAM`).
    pub fn from_parts(
        approved: Option<bool>,
        status: Option<CommentStatus>,
    ) -> Result<Self, ValidationError> {
        match (approved, status) {
            (None, None) => Err(ValidationError::Invalid(
                "either approved or status is required".to_string(),
            )),
            (Some(approved), Some(status)) if approved != status.is_approved() => {
                Err(ValidationError::Invalid(format!(
                    "approved={approved} conflicts with status {status}"
                )))
            }
            (_, Some(status)) => Ok(Self::new(status)),
            (Some(true), None) => Ok(Self::new(CommentStatus::Approved)),
            (Some(false), None) => Ok(Self::new(CommentStatus::Pending)),
        }
    }

    #[must_use]
    pub const fn status(self) -> CommentStatus {
        self.status
    }

    #[must_use]
    pub const fn approved(self) -> bool {
        self.status.is_approved()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_comment_content_bounds() {
        let post = PostId::new(1);
        assert!(matches!(
            NewComment::parse(post, "Bob", None, "too short"),
            Err(ValidationError::TooShort { .. })
        ));
        assert!(matches!(
            NewComment::parse(post, "Bob", None, &"a".repeat(CONTENT_MAX + 1)),
            Err(ValidationError::TooLong { .. })
        ));
        assert!(NewComment::parse(post, "Bob", None, &"a".repeat(CONTENT_MAX)).is_ok());
        assert!(NewComment::parse(post, "Bob", None, &"a".repeat(CONTENT_MIN)).is_ok());
    }

    #[test]
    fn test_new_comment_name_and_email() {
        let post = PostId::new(1);
        assert_eq!(
            NewComment::parse(post, "  ", None, "Great article, thanks!"),
            Err(ValidationError::Required("name"))
        );
        assert!(matches!(
            NewComment::parse(post, &"n".repeat(101), None, "Great article, thanks!"),
            Err(ValidationError::TooLong { field: "name", .. })
        ));
        assert_eq!(
            NewComment::parse(post, "Bob", Some("not-an-email"), "Great article, thanks!"),
            Err(ValidationError::InvalidEmail("email"))
        );
        let blank_email = NewComment::parse(post, "Bob", Some("   "), "Great article, thanks!");
        assert!(blank_email.is_ok_and(|c| c.email.is_none()));
    }

    #[test]
    fn test_moderation_command_normalization() {
        let cmd = |a, s| ModerationCommand::from_parts(a, s).map(ModerationCommand::status);

        assert_eq!(cmd(Some(true), None), Ok(CommentStatus::Approved));
        assert_eq!(cmd(Some(false), None), Ok(CommentStatus::Pending));
        assert_eq!(
            cmd(None, Some(CommentStatus::Spam)),
            Ok(CommentStatus::Spam)
        );
        assert_eq!(
            cmd(Some(false), Some(CommentStatus::Rejected)),
            Ok(CommentStatus::Rejected)
        );
        assert_eq!(
            cmd(Some(true), Some(CommentStatus::Approved)),
            Ok(CommentStatus::Approved)
        );
        assert!(cmd(None, None).is_err());
        assert!(cmd(Some(true), Some(CommentStatus::Spam)).is_err());
        assert!(cmd(Some(false), Some(CommentStatus::Approved)).is_err());
    }

    #[test]
    fn test_moderation_command_keeps_approved_in_sync() {
        for status in [
            CommentStatus::Pending,
            CommentStatus::Approved,
            CommentStatus::Rejected,
            CommentStatus::Spam,
        ] {
            let cmd = ModerationCommand::new(status);
            assert_eq!(cmd.approved(), status == CommentStatus::Approved);
        }
    }
}
