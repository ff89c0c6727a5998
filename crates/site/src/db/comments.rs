//! Comment repository.
//!
//! Every status write sets `approved` from the status in the same statement,
//! and the table carries a CHECK constraint enforcing the same invariant.

use chrono::{DateTime, Utc};
use redline_core::{CommentId, CommentStatus, Email, PostId};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{Comment, NewComment};

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: i32,
    post_id: i32,
    name: String,
    email: Option<String>,
    content: String,
    status: CommentStatus,
    approved: bool,
    spam_score: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = RepositoryError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        if row.approved != row.status.is_approved() {
            return Err(RepositoryError::DataCorruption(format!(
                "comment {} has approved={} but status {}",
                row.id, row.approved, row.status
            )));
        }
        let email = row
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email in comment {}: {e}", row.id))
            })?;

        Ok(Self {
            id: CommentId::new(row.id),
            post_id: PostId::new(row.post_id),
            name: row.name,
            email,
            content: row.content,
            status: row.status,
            approved: row.approved,
            spam_score: row.spam_score,
            created_at: row.created_at,
        })
    }
}

const COMMENT_COLUMNS: &str =
    "id, post_id, name, email, content, status, approved, spam_score, created_at";

pub struct CommentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CommentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new submission. New comments are never approved, whatever
    /// `status` the classifier produced.
    ///
    /// `content` is the sanitized body, which may differ from `new.content`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if the post does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        new: &NewComment,
        content: &str,
        status: CommentStatus,
        spam_score: f64,
    ) -> Result<Comment, RepositoryError> {
        let status = if status.is_approved() {
            CommentStatus::Pending
        } else {
            status
        };

        let row: CommentRow = sqlx::query_as(&format!(
            "INSERT INTO comments (post_id, name, email, content, status, approved, spam_score)
             VALUES ($1, $2, $3, $4, $5, FALSE, $6)
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(new.post_id)
        .bind(&new.name)
        .bind(new.email.as_ref().map(Email::as_str))
        .bind(content)
        .bind(status)
        .bind(spam_score)
        .fetch_one(self.pool)
        .await?;
        row.try_into()
    }

    /// Get a comment by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CommentId) -> Result<Option<Comment>, RepositoryError> {
        let row: Option<CommentRow> =
            sqlx::query_as(&format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Approved comments of a published post, oldest first.
    ///
    /// Returns nothing for unpublished posts even if comments are approved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_public(&self, post_id: PostId) -> Result<Vec<Comment>, RepositoryError> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            "SELECT c.id, c.post_id, c.name, c.email, c.content, c.status, c.approved,
                    c.spam_score, c.created_at
             FROM comments c
             JOIN posts p ON p.id = c.post_id
             WHERE c.post_id = $1 AND c.approved = TRUE AND p.published = TRUE
             ORDER BY c.created_at ASC",
        )
        .bind(post_id)
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Comments for the moderation queue, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_admin(
        &self,
        status: Option<CommentStatus>,
        post_id: Option<PostId>,
    ) -> Result<Vec<Comment>, RepositoryError> {
        let rows: Vec<CommentRow> = sqlx::query_as(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments
             WHERE ($1::comment_status IS NULL OR status = $1)
               AND ($2::integer IS NULL OR post_id = $2)
             ORDER BY created_at DESC"
        ))
        .bind(status)
        .bind(post_id)
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Set a comment's status, keeping `approved` in sync.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the comment does not exist.
    pub async fn set_status(
        &self,
        id: CommentId,
        status: CommentStatus,
    ) -> Result<Comment, RepositoryError> {
        let row: Option<CommentRow> = sqlx::query_as(&format!(
            "UPDATE comments SET status = $2, approved = $3 WHERE id = $1
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .bind(status.is_approved())
        .fetch_optional(self.pool)
        .await?;
        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Approve many comments in one statement.
    ///
    /// Returns the IDs of the posts whose comments changed. Unknown comment
    /// IDs are ignored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn approve_many(&self, ids: &[CommentId]) -> Result<Vec<PostId>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(CommentId::as_i32).collect();
        let post_ids: Vec<i32> = sqlx::query_scalar(
            "WITH updated AS (
                 UPDATE comments SET status = 'APPROVED', approved = TRUE
                 WHERE id = ANY($1)
                 RETURNING post_id
             )
             SELECT DISTINCT post_id FROM updated",
        )
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;
        Ok(post_ids.into_iter().map(PostId::new).collect())
    }

    /// Delete a comment, returning it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the comment does not exist.
    pub async fn delete(&self, id: CommentId) -> Result<Comment, RepositoryError> {
        let row: Option<CommentRow> = sqlx::query_as(&format!(
            "DELETE FROM comments WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        row.ok_or(RepositoryError::NotFound)?.try_into()
    }
}
