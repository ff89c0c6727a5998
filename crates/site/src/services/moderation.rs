//! Comment moderation workflow.
//!
//! Public submission runs validation, the published-post check, spam
//! classification and sanitization before anything is stored. Admin actions
//! change a comment's status and drop the cached pages that show it.

use std::collections::BTreeSet;

use redline_core::{CommentId, PostId};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use super::cache::PageCache;
use super::sanitize::sanitize;
use super::spam::{self, CommentCandidate};
use crate::db::{CommentRepository, PostRepository, RepositoryError};
use crate::models::comment::{CONTENT_MAX, CONTENT_MIN};
use crate::models::{Comment, ModerationCommand, NewComment, ValidationError, bounded_text};

/// Reply for every accepted submission, spam or not.
pub const SUBMISSION_RECEIPT: &str =
    "Thank you! Your comment has been submitted and is awaiting moderation.";

/// Largest id list accepted by [`ModerationService::bulk_approve`].
pub const MAX_BULK_APPROVE: usize = 100;

/// Errors from the moderation workflow.
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The target post does not exist or is not published.
    #[error("post not found")]
    PostNotFound,

    /// The target comment does not exist.
    #[error("comment not found")]
    CommentNotFound,

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ModerationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::CommentNotFound,
            other => Self::Repository(other),
        }
    }
}

/// Raw comment fields as received from a visitor.
#[derive(Debug, Clone, Copy)]
pub struct CommentSubmission<'a> {
    pub post_id: PostId,
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub content: &'a str,
}

/// What the visitor is told after submitting.
///
/// Identical for pending and spam outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct CommentReceipt {
    pub success: bool,
    pub message: &'static str,
}

impl Default for CommentReceipt {
    fn default() -> Self {
        Self {
            success: true,
            message: SUBMISSION_RECEIPT,
        }
    }
}

/// Orchestrates comment submission and moderation.
pub struct ModerationService<'a> {
    comments: CommentRepository<'a>,
    posts: PostRepository<'a>,
    cache: &'a PageCache,
}

impl<'a> ModerationService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a PageCache) -> Self {
        Self {
            comments: CommentRepository::new(pool),
            posts: PostRepository::new(pool),
            cache,
        }
    }

    /// Accept a visitor comment into the moderation queue.
    ///
    /// `client` is the rate-limit identity, used for logging only.
    ///
    /// # Errors
    ///
    /// Returns `ModerationError::Validation` for bad fields, including content
    /// that falls below the minimum once sanitized (both checked before the
    /// database is touched) and `ModerationError::PostNotFound` when the post
    /// is missing or unpublished.
    pub async fn submit_comment(
        &self,
        client: &str,
        submission: CommentSubmission<'_>,
    ) -> Result<CommentReceipt, ModerationError> {
        let new = NewComment::parse(
            submission.post_id,
            submission.name,
            submission.email,
            submission.content,
        )?;
        // Markup can pass the raw length check and still clean down to nothing.
        let content = bounded_text(
            "content",
            &sanitize(&new.content),
            CONTENT_MIN,
            CONTENT_MAX,
        )?;

        if !self.posts.is_published(new.post_id).await? {
            return Err(ModerationError::PostNotFound);
        }

        let verdict = spam::classify(&CommentCandidate {
            name: &new.name,
            email: submission.email,
            content: &new.content,
        });

        let comment = self
            .comments
            .create(&new, &content, verdict.status, verdict.score)
            .await
            .map_err(|e| match e {
                RepositoryError::InvalidReference(_) => ModerationError::PostNotFound,
                other => ModerationError::Repository(other),
            })?;

        tracing::info!(
            comment_id = %comment.id,
            post_id = %comment.post_id,
            status = %comment.status,
            score = verdict.score,
            reasons = ?verdict.reasons,
            client,
            "comment submitted"
        );

        Ok(CommentReceipt::default())
    }

    /// Apply an admin moderation decision.
    ///
    /// # Errors
    ///
    /// Returns `ModerationError::CommentNotFound` if the comment does not exist.
    pub async fn moderate(
        &self,
        id: CommentId,
        command: ModerationCommand,
    ) -> Result<Comment, ModerationError> {
        let comment = self.comments.set_status(id, command.status()).await?;
        self.invalidate_post_pages([comment.post_id]).await?;

        tracing::info!(comment_id = %id, status = %comment.status, "comment moderated");
        Ok(comment)
    }

    /// Approve several comments in one statement.
    ///
    /// Duplicate ids are collapsed; unknown ids are ignored. Returns the number
    /// of posts whose public comment lists changed.
    ///
    /// # Errors
    ///
    /// Returns `ModerationError::Validation` for an empty list or one longer
    /// than [`MAX_BULK_APPROVE`].
    pub async fn bulk_approve(&self, ids: &[CommentId]) -> Result<usize, ModerationError> {
        let ids: Vec<CommentId> = ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        validate_bulk_ids(&ids)?;

        let post_ids = self.comments.approve_many(&ids).await?;
        self.invalidate_post_pages(post_ids.iter().copied()).await?;

        tracing::info!(comments = ids.len(), posts = post_ids.len(), "bulk approved comments");
        Ok(post_ids.len())
    }

    /// Delete a comment.
    ///
    /// # Errors
    ///
    /// Returns `ModerationError::CommentNotFound` if the comment does not exist.
    pub async fn delete(&self, id: CommentId) -> Result<Comment, ModerationError> {
        let comment = self.comments.delete(id).await?;
        self.invalidate_post_pages([comment.post_id]).await?;

        tracing::info!(comment_id = %id, "comment deleted");
        Ok(comment)
    }

    async fn invalidate_post_pages(
        &self,
        post_ids: impl IntoIterator<Item = PostId>,
    ) -> Result<(), ModerationError> {
        for post_id in post_ids {
            let post = self
                .posts
                .get_by_id(post_id)
                .await
                .map_err(ModerationError::Repository)?;
            if let Some(post) = post {
                self.cache.invalidate_post(&post.slug).await;
            }
        }
        self.cache.invalidate_index().await;
        Ok(())
    }
}

fn validate_bulk_ids(ids: &[CommentId]) -> Result<(), ValidationError> {
    if ids.is_empty() {
        return Err(ValidationError::Required("ids"));
    }
    if ids.len() > MAX_BULK_APPROVE {
        return Err(ValidationError::Invalid(format!(
            "at most {MAX_BULK_APPROVE} comments can be approved at once"
        )));
    }
    Ok(())
}
