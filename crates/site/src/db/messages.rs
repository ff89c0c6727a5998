//! Contact message repository.

use chrono::{DateTime, Utc};
use redline_core::{Email, MessageId};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{ContactMessage, NewContactMessage};

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i32,
    name: String,
    email: String,
    message: String,
    read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for ContactMessage {
    type Error = RepositoryError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in message {}: {e}", row.id))
        })?;
        Ok(Self {
            id: MessageId::new(row.id),
            name: row.name,
            email,
            message: row.message,
            read: row.read,
            created_at: row.created_at,
        })
    }
}

const MESSAGE_COLUMNS: &str = "id, name, email, message, read, created_at";

pub struct MessageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MessageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a submitted message. The body must already be sanitized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, new: &NewContactMessage) -> Result<ContactMessage, RepositoryError> {
        let row: MessageRow = sqlx::query_as(&format!(
            "INSERT INTO contact_messages (name, email, message) VALUES ($1, $2, $3)
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(new.email.as_str())
        .bind(&new.message)
        .fetch_one(self.pool)
        .await?;
        row.try_into()
    }

    /// List messages, newest first, optionally only unread ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, unread_only: bool) -> Result<Vec<ContactMessage>, RepositoryError> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM contact_messages
             WHERE ($1 = FALSE OR read = FALSE)
             ORDER BY created_at DESC"
        ))
        .bind(unread_only)
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Set the read flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the message does not exist.
    pub async fn set_read(
        &self,
        id: MessageId,
        read: bool,
    ) -> Result<ContactMessage, RepositoryError> {
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            "UPDATE contact_messages SET read = $2 WHERE id = $1 RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(read)
        .fetch_optional(self.pool)
        .await?;
        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Delete a message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the message does not exist.
    pub async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
