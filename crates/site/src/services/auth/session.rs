//! Server-side session store.

use chrono::{DateTime, Utc};
use redline_core::UserId;
use sqlx::PgPool;

use crate::db::{RepositoryError, SessionRepository, UserRepository};
use crate::models::session::SESSION_TTL;
use crate::models::{Session, SessionToken, User};

/// Issues, resolves and revokes opaque session tokens.
pub struct SessionStore<'a> {
    sessions: SessionRepository<'a>,
    users: UserRepository<'a>,
}

impl<'a> SessionStore<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            sessions: SessionRepository::new(pool),
            users: UserRepository::new(pool),
        }
    }

    /// Issue a new session for `user_id`, valid for [`SESSION_TTL`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the session cannot be stored.
    pub async fn create(
        &self,
        user_id: UserId,
    ) -> Result<(SessionToken, DateTime<Utc>), RepositoryError> {
        let token = SessionToken::generate();
        let expires_at = Utc::now() + SESSION_TTL;
        self.sessions.insert(&token, user_id, expires_at).await?;

        tracing::debug!(user_id = %user_id, "session created");
        Ok((token, expires_at))
    }

    /// Resolve a token to its session and user.
    ///
    /// An expired session is deleted and reported as absent, so a second call
    /// with the same token also returns `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the lookup fails.
    pub async fn get(
        &self,
        token: &SessionToken,
    ) -> Result<Option<(Session, User)>, RepositoryError> {
        let Some(session) = self.sessions.get(token).await? else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            self.sessions.delete(token).await?;
            tracing::debug!(user_id = %session.user_id, "expired session removed");
            return Ok(None);
        }

        let user = self.users.get_by_id(session.user_id).await?;
        Ok(user.map(|user| (session, user)))
    }

    /// Delete a session. Unknown tokens are not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the delete fails.
    pub async fn revoke(&self, token: &SessionToken) -> Result<bool, RepositoryError> {
        self.sessions.delete(token).await
    }

    /// Delete every expired session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let removed = self.sessions.delete_expired(Utc::now()).await?;
        if removed > 0 {
            tracing::info!(removed, "purged expired sessions");
        }
        Ok(removed)
    }
}
