//! Newsletter subscriber list.

use axum::{Json, Router, extract::State, routing::get};

use crate::db::SubscriberRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::Subscriber;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/subscribers", get(list))
}

pub async fn list(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Subscriber>>> {
    Ok(Json(SubscriberRepository::new(state.pool()).list().await?))
}
