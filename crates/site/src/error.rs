//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Bodies are always `{"error": "..."}`. Server-side failures (5xx) respond
//! with a generic message and carry the real one in an [`ErrorDetail`]
//! response extension; [`expose_error_details`] swaps it back in outside
//! production.

use std::time::Duration;

use axum::{
    Json,
    extract::{Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::ValidationError;
use crate::services::auth::AuthError;
use crate::services::images::ImageStoreError;
use crate::services::moderation::ModerationError;
use crate::state::AppState;

/// Application-level error type for the site.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Moderation workflow failed.
    #[error("Moderation error: {0}")]
    Moderation(#[from] ModerationError),

    /// Image store operation failed.
    #[error("Image store error: {0}")]
    ImageStore(#[from] ImageStoreError),

    /// A request field failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Request body was not the expected JSON.
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Duplicate of an existing resource.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited { retry_after: Duration },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The unredacted message of a server-side error.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

const INTERNAL_MESSAGE: &str = "Internal server error";
const UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable";

impl AppError {
    /// Status code and client-safe message.
    fn classify(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => classify_repository(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
                }
                AuthError::SetupClosed => (
                    StatusCode::FORBIDDEN,
                    "Setup has already been completed".to_string(),
                ),
                AuthError::NotAdminEmail => (
                    StatusCode::FORBIDDEN,
                    "Setup must use the configured admin email".to_string(),
                ),
                AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                AuthError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email address".to_string())
                }
                AuthError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
                AuthError::Repository(e) => classify_repository(e),
                AuthError::PasswordHash => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_MESSAGE.to_string(),
                ),
            },
            Self::Moderation(err) => match err {
                ModerationError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
                ModerationError::PostNotFound => {
                    (StatusCode::NOT_FOUND, "Post not found".to_string())
                }
                ModerationError::CommentNotFound => {
                    (StatusCode::NOT_FOUND, "Comment not found".to_string())
                }
                ModerationError::Repository(e) => classify_repository(e),
            },
            Self::ImageStore(err) => match err {
                ImageStoreError::NotConfigured => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Image uploads are not configured".to_string(),
                ),
                e if e.is_invalid_input() => (StatusCode::BAD_REQUEST, e.to_string()),
                _ => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Image service unavailable".to_string(),
                ),
            },
            Self::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::InvalidBody(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please try again later".to_string(),
            ),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_MESSAGE.to_string(),
            ),
        }
    }
}

fn classify_repository(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::Unavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            UNAVAILABLE_MESSAGE.to_string(),
        ),
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        RepositoryError::Conflict(_) => (
            StatusCode::CONFLICT,
            "A record with this value already exists".to_string(),
        ),
        RepositoryError::InvalidReference(_) => (
            StatusCode::BAD_REQUEST,
            "Referenced record does not exist".to_string(),
        ),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            INTERNAL_MESSAGE.to_string(),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.classify();

        // Capture server errors to Sentry
        let detail = if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
            Some(ErrorDetail(self.to_string()))
        } else {
            None
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();

        if let Self::RateLimited { retry_after } = self {
            let secs = retry_after_secs(retry_after);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        if let Some(detail) = detail {
            response.extensions_mut().insert(detail);
        }

        response
    }
}

/// `Retry-After` seconds, rounded up and never zero.
#[must_use]
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

/// Middleware that puts server-side error details back into the body when
/// the environment allows it.
pub async fn expose_error_details(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if !state.config().expose_error_details() {
        return response;
    }
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    let body = Json(json!({ "error": detail })).into_response().into_body();
    Response::from_parts(parts, body)
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("Post".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Validation(ValidationError::Required("name"))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::SetupClosed)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::NotAdminEmail)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::ImageStore(ImageStoreError::NotConfigured)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::ImageStore(ImageStoreError::Empty)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_repository_errors_are_classified() {
        assert_eq!(
            get_status(RepositoryError::Unavailable(sqlx::Error::PoolTimedOut).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("posts_slug_key".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(RepositoryError::InvalidReference("fk".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RepositoryError::DataCorruption("bad".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited {
            retry_after: Duration::from_millis(1500),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "2");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail_in_body() {
        let response = AppError::Internal("pool exploded at row 7".to_string()).into_response();
        assert!(response.extensions().get::<ErrorDetail>().is_some());

        let body = body_json(response).await;
        assert_eq!(body["error"], INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_invalid_credentials_message_is_generic() {
        let body = body_json(AppError::Auth(AuthError::InvalidCredentials).into_response()).await;
        assert_eq!(body["error"], "Invalid credentials");
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_secs(60)), 60);
        assert_eq!(retry_after_secs(Duration::from_millis(60_001)), 61);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
    }
}
