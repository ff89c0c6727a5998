//! Public comment submission.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    routing::post,
};
use redline_core::PostId;
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::client_key;
use crate::services::moderation::{CommentReceipt, CommentSubmission, ModerationService};
use crate::state::AppState;

/// Comment form data.
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(alias = "postId")]
    pub post_id: PostId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub content: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/comments", post(submit))
}

/// Submit a comment for moderation.
///
/// POST /api/comments
///
/// The reply is the same whether the comment was queued or flagged as spam.
#[instrument(skip_all, fields(post_id = tracing::field::Empty))]
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: std::result::Result<Json<CommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentReceipt>)> {
    let Json(req) = body?;
    tracing::Span::current().record("post_id", req.post_id.as_i32());

    let receipt = ModerationService::new(state.pool(), state.pages())
        .submit_comment(
            &client_key(&headers),
            CommentSubmission {
                post_id: req.post_id,
                name: &req.name,
                email: req.email.as_deref(),
                content: &req.content,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{body::Body, http::Request, http::header};
    use tower::ServiceExt;

    use super::*;
    use crate::state::tests::test_state;

    async fn submit_json(body: &'static str) -> (StatusCode, serde_json::Value) {
        let response = router()
            .with_state(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/comments")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_short_content_is_rejected_before_lookup() {
        let (status, body) =
            submit_json(r#"{"postId": 1, "name": "Sam", "content": "too short"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "content must be at least 10 characters");
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected() {
        let (status, body) = submit_json(
            concat!(
                r#"{"post_id": 1, "name": "Sam", "email": "not-an-email", "#,
                r#""content": "Great write-up on the intake."}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "email is not a valid email address");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let (status, body) = submit_json(r#"{"name": "Sam"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
