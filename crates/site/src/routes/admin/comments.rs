//! Comment moderation.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, patch, post},
};
use redline_core::{CommentId, CommentStatus, PostId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::CommentRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Comment, ModerationCommand};
use crate::services::moderation::ModerationService;
use crate::state::AppState;

/// Queue filters.
#[derive(Debug, Default, Deserialize)]
pub struct CommentFilter {
    pub status: Option<String>,
    #[serde(alias = "postId")]
    pub post_id: Option<PostId>,
}

/// Moderation body: `approved`, `status`, or both if they agree.
#[derive(Debug, Deserialize)]
pub struct ModerateRequest {
    pub approved: Option<bool>,
    pub status: Option<CommentStatus>,
}

#[derive(Debug, Deserialize)]
pub struct BulkApproveRequest {
    pub ids: Vec<CommentId>,
}

#[derive(Debug, Serialize)]
pub struct BulkApproveResponse {
    pub success: bool,
    pub posts_updated: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/comments", get(list))
        .route("/api/admin/comments/bulk-approve", post(bulk_approve))
        .route(
            "/api/admin/comments/{id}",
            patch(moderate).delete(destroy),
        )
}

/// Moderation queue, newest first.
pub async fn list(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(filter): Query<CommentFilter>,
) -> Result<Json<Vec<Comment>>> {
    let status = filter
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<CommentStatus>)
        .transpose()
        .map_err(AppError::BadRequest)?;

    let comments = CommentRepository::new(state.pool())
        .list_admin(status, filter.post_id)
        .await?;
    Ok(Json(comments))
}

#[instrument(skip_all, fields(comment_id = %id))]
pub async fn moderate(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CommentId>,
    body: std::result::Result<Json<ModerateRequest>, JsonRejection>,
) -> Result<Json<Comment>> {
    let Json(req) = body?;
    let command = ModerationCommand::from_parts(req.approved, req.status)?;

    let comment = ModerationService::new(state.pool(), state.pages())
        .moderate(id, command)
        .await?;
    Ok(Json(comment))
}

#[instrument(skip_all)]
pub async fn bulk_approve(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    body: std::result::Result<Json<BulkApproveRequest>, JsonRejection>,
) -> Result<Json<BulkApproveResponse>> {
    let Json(req) = body?;
    let posts_updated = ModerationService::new(state.pool(), state.pages())
        .bulk_approve(&req.ids)
        .await?;
    Ok(Json(BulkApproveResponse {
        success: true,
        posts_updated,
    }))
}

#[instrument(skip_all, fields(comment_id = %id))]
pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CommentId>,
) -> Result<StatusCode> {
    ModerationService::new(state.pool(), state.pages())
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
