//! Admin authorization.
//!
//! There is exactly one operator identity: the configured `ADMIN_EMAIL`.
//! Roles stored on accounts are informational and never consulted here.

use redline_core::Email;

use crate::models::{CurrentUser, User};

/// Decides whether an authenticated user is the site operator.
#[derive(Debug, Clone)]
pub struct AdminGate {
    admin_email: Email,
}

impl AdminGate {
    #[must_use]
    pub const fn new(admin_email: Email) -> Self {
        Self { admin_email }
    }

    /// Case-insensitive match against the configured admin email.
    #[must_use]
    pub fn is_admin(&self, email: &Email) -> bool {
        self.admin_email.matches(email.as_str())
    }

    /// Attach the admin decision to a resolved user.
    #[must_use]
    pub fn current_user(&self, user: User) -> CurrentUser {
        let is_admin = self.is_admin(&user.email);
        CurrentUser::new(user, is_admin)
    }
}
