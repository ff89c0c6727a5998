//! Newsletter sign-up handler.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use redline_core::Email;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::SubscriberRepository;
use crate::error::Result;
use crate::models::ValidationError;
use crate::state::AppState;

/// Newsletter subscription form data.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/newsletter", post(subscribe))
}

/// Subscribe an email address.
///
/// POST /api/newsletter
///
/// Idempotent: an address that is already subscribed gets the same reply.
#[instrument(skip_all)]
pub async fn subscribe(
    State(state): State<AppState>,
    body: std::result::Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Json<SubscribeResponse>> {
    let Json(req) = body?;
    if req.email.trim().is_empty() {
        return Err(ValidationError::Required("email").into());
    }
    let email = Email::parse(&req.email).map_err(|_| ValidationError::InvalidEmail("email"))?;

    let created = SubscriberRepository::new(state.pool())
        .subscribe(&email)
        .await?;
    tracing::info!(created, "newsletter subscription");

    Ok(Json(SubscribeResponse {
        success: true,
        message: "You're subscribed!",
    }))
}
