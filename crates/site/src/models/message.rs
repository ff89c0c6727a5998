//! Contact form messages.

use chrono::{DateTime, Utc};
use redline_core::{Email, MessageId};
use serde::Serialize;

use super::{ValidationError, bounded_text};

pub const NAME_MAX: usize = 100;
pub const MESSAGE_MIN: usize = 10;
pub const MESSAGE_MAX: usize = 5000;

/// A visitor inquiry, independent of any post.
#[derive(Debug, Clone, Serialize)]
pub struct ContactMessage {
    pub id: MessageId,
    pub name: String,
    pub email: Email,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A validated contact form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContactMessage {
    pub name: String,
    pub email: Email,
    pub message: String,
}

impl NewContactMessage {
    /// Validate raw form fields.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a missing or over-long name, an
    /// invalid email, or a message outside 10-5000 characters.
    pub fn parse(name: &str, email: &str, message: &str) -> Result<Self, ValidationError> {
        let name = bounded_text("name", name, 1, NAME_MAX)?;
        if email.trim().is_empty() {
            return Err(ValidationError::Required("email"));
        }
        let email = Email::parse(email).map_err(|_| ValidationError::InvalidEmail("email"))?;
        let message = bounded_text("message", message, MESSAGE_MIN, MESSAGE_MAX)?;
        Ok(Self {
            name,
            email,
            message,
        })
    }
}
