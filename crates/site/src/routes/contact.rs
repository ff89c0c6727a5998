//! Contact form handler.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::MessageRepository;
use crate::error::Result;
use crate::models::message::{MESSAGE_MAX, MESSAGE_MIN, NAME_MAX};
use crate::models::{NewContactMessage, bounded_text};
use crate::services::sanitize::sanitize;
use crate::state::AppState;

/// Contact form data.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Response for form submission.
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/contact", post(submit))
}

/// Store a contact message for the operator.
///
/// POST /api/contact
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    body: std::result::Result<Json<ContactRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ContactResponse>)> {
    let Json(req) = body?;
    let parsed = NewContactMessage::parse(&req.name, &req.email, &req.message)?;
    // Re-check after sanitizing so markup-only input cannot store blanks.
    let clean = NewContactMessage {
        name: bounded_text("name", &sanitize(&parsed.name), 1, NAME_MAX)?,
        message: bounded_text(
            "message",
            &sanitize(&parsed.message),
            MESSAGE_MIN,
            MESSAGE_MAX,
        )?,
        ..parsed
    };

    let stored = MessageRepository::new(state.pool()).create(&clean).await?;
    tracing::info!(message_id = %stored.id, "contact message received");

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            success: true,
            message: "Thanks for reaching out! We'll get back to you soon.",
        }),
    ))
}
