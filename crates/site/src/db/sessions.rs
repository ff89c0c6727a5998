//! Session repository.
//!
//! Sessions are keyed by the SHA-256 digest of the cookie token; the raw token
//! never reaches the database.

use chrono::{DateTime, Utc};
use redline_core::UserId;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{Session, SessionToken};

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    user_id: i32,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            user_id: UserId::new(row.user_id),
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

/// Repository for session rows.
pub struct SessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SessionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if the user does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert(
        &self,
        token: &SessionToken,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token.digest())
            .bind(user_id)
            .bind(expires_at)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Look up a session by token, regardless of expiry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, token: &SessionToken) -> Result<Option<Session>, RepositoryError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT user_id, expires_at, created_at FROM sessions WHERE token_hash = $1",
        )
        .bind(token.digest())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Delete a session. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, token: &SessionToken) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token.digest())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every session that expired at or before `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
