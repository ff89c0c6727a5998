//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Liveness check
//! GET  /health/ready                 - Readiness check (database)
//!
//! # Blog (HTML, page-cached)
//! GET  /blog                         - Published posts
//! GET  /blog/{slug}                  - Post with approved comments
//!
//! # Public API (read limit)
//! GET  /api/posts                    - Published posts
//! GET  /api/posts/{slug}             - Published post
//! GET  /api/posts/{slug}/comments    - Approved comments
//!
//! # Visitor input
//! POST /api/comments                 - Submit comment (comment limit)
//! POST /api/contact                  - Contact form (contact limit)
//! POST /api/newsletter               - Newsletter sign-up (contact limit)
//!
//! # Auth
//! POST /api/auth/login               - Login (auth limit)
//! POST /api/auth/setup               - First account (auth limit)
//! POST /api/auth/logout              - Logout
//! GET  /api/auth/session             - Current session
//!
//! # Admin (admin only, write limit)
//! GET|POST         /api/admin/posts
//! GET|PATCH|DELETE /api/admin/posts/{id}
//! GET              /api/admin/comments
//! PATCH|DELETE     /api/admin/comments/{id}
//! POST             /api/admin/comments/bulk-approve
//! GET              /api/admin/messages
//! PATCH|DELETE     /api/admin/messages/{id}
//! GET              /api/admin/subscribers
//! POST             /api/admin/images
//! DELETE           /api/admin/images/{*public_id}
//! ```

pub mod admin;
pub mod auth;
pub mod blog;
pub mod comments;
pub mod contact;
pub mod newsletter;
pub mod posts;

use axum::{Router, extract::State, http::StatusCode, middleware::from_fn_with_state, routing::get};

use crate::middleware::{
    auth_rate_limit, comment_rate_limit, contact_rate_limit, read_rate_limit, write_rate_limit,
};
use crate::state::AppState;

/// Create all routes for the site, each group behind its rate limit.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(blog::router())
        .merge(auth::session_router())
        .merge(
            auth::credential_router()
                .route_layer(from_fn_with_state(state.clone(), auth_rate_limit)),
        )
        .merge(posts::router().route_layer(from_fn_with_state(state.clone(), read_rate_limit)))
        .merge(
            comments::router().route_layer(from_fn_with_state(state.clone(), comment_rate_limit)),
        )
        .merge(
            contact::router()
                .merge(newsletter::router())
                .route_layer(from_fn_with_state(state.clone(), contact_rate_limit)),
        )
        .merge(admin::router().route_layer(from_fn_with_state(state.clone(), write_rate_limit)))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{body::Body, http::Request, http::header};
    use tower::ServiceExt;

    use super::*;
    use crate::state::tests::test_state;

    fn app() -> Router {
        let state = test_state();
        routes(&state).with_state(state)
    }

    async fn send(request: Request<Body>) -> axum::response::Response {
        app().oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = send(Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_routes_require_session() {
        for (method, uri) in [
            ("GET", "/api/admin/posts"),
            ("GET", "/api/admin/comments"),
            ("PATCH", "/api/admin/comments/1"),
            ("POST", "/api/admin/comments/bulk-approve"),
            ("GET", "/api/admin/messages"),
            ("GET", "/api/admin/subscribers"),
            ("DELETE", "/api/admin/images/redline/abc"),
        ] {
            let response = send(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_admin_responses_carry_rate_limit_headers() {
        let response = send(
            Request::builder()
                .uri("/api/admin/posts")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.headers()["x-ratelimit-limit"], "30");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "29");
    }

    #[tokio::test]
    async fn test_contact_validation_error() {
        let response = send(
            Request::builder()
                .method("POST")
                .uri("/api/contact")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"name": "Sam", "email": "sam@example.com", "message": "hi"}"#,
                ))
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-ratelimit-limit"], "3");
    }

    #[tokio::test]
    async fn test_contact_rejects_markup_only_fields() {
        for body in [
            r#"{"name": "Sam", "email": "sam@example.com", "message": "<b></b><i></i><u></u>"}"#,
            r#"{"name": "<b></b>", "email": "sam@example.com", "message": "Quote for a tune?"}"#,
        ] {
            let response = send(
                Request::builder()
                    .method("POST")
                    .uri("/api/contact")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;

            // Rejected before the insert; the test pool has no database.
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        }
    }

    #[tokio::test]
    async fn test_newsletter_rejects_bad_email() {
        let response = send(
            Request::builder()
                .method("POST")
                .uri("/api/newsletter")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"email": "nope"}"#))
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
