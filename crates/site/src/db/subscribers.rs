//! Newsletter subscriber repository.

use chrono::{DateTime, Utc};
use redline_core::{Email, SubscriberId};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::Subscriber;

#[derive(Debug, sqlx::FromRow)]
struct SubscriberRow {
    id: i32,
    email: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = RepositoryError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid subscriber email: {e}"))
        })?;
        Ok(Self {
            id: SubscriberId::new(row.id),
            email,
            created_at: row.created_at,
        })
    }
}

pub struct SubscriberRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriberRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe an email. Returns `false` when it was already subscribed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn subscribe(&self, email: &Email) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("INSERT INTO subscribers (email) VALUES ($1) ON CONFLICT DO NOTHING")
                .bind(email.as_str())
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List subscribers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Subscriber>, RepositoryError> {
        let rows: Vec<SubscriberRow> =
            sqlx::query_as("SELECT id, email, created_at FROM subscribers ORDER BY created_at DESC")
                .fetch_all(self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
