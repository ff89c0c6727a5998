//! Contact message inbox.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, patch},
};
use redline_core::MessageId;
use serde::Deserialize;

use crate::db::{MessageRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::ContactMessage;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MessageFilter {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub read: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/messages", get(list))
        .route("/api/admin/messages/{id}", patch(mark).delete(destroy))
}

pub async fn list(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(filter): Query<MessageFilter>,
) -> Result<Json<Vec<ContactMessage>>> {
    let messages = MessageRepository::new(state.pool())
        .list(filter.unread)
        .await?;
    Ok(Json(messages))
}

pub async fn mark(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
    body: std::result::Result<Json<MarkReadRequest>, JsonRejection>,
) -> Result<Json<ContactMessage>> {
    let Json(req) = body?;
    let message = MessageRepository::new(state.pool())
        .set_read(id, req.read)
        .await
        .map_err(not_found_as_message)?;
    Ok(Json(message))
}

pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<MessageId>,
) -> Result<StatusCode> {
    MessageRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found_as_message)?;
    Ok(StatusCode::NO_CONTENT)
}

fn not_found_as_message(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Message".to_string()),
        other => other.into(),
    }
}
