//! Admin JSON API.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin), so
//! anonymous callers get 401 and any other account gets 403.

pub mod comments;
pub mod images;
pub mod messages;
pub mod posts;
pub mod subscribers;

use axum::Router;

use crate::state::AppState;

/// All admin routes under `/api/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(posts::router())
        .merge(comments::router())
        .merge(messages::router())
        .merge(subscribers::router())
        .merge(images::router())
}
