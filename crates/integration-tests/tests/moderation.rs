//! End-to-end comment submission and moderation.

use axum::http::{Method, StatusCode};
use redline_core::{CommentStatus, Slug};
use redline_integration_tests::TestContext;
use redline_site::services::cache::PageKey;
use redline_site::services::moderation::SUBMISSION_RECEIPT;
use serde_json::{Value, json};

async fn published_post(ctx: &TestContext, cookie: &str) -> Value {
    ctx.create_post(
        cookie,
        "Dyno Day Results",
        "We ran twelve cars on the dyno this weekend.",
        true,
    )
    .await
}

async fn stored_comment(ctx: &TestContext) -> (CommentStatus, bool) {
    sqlx::query_as("SELECT status, approved FROM comments ORDER BY id DESC LIMIT 1")
        .fetch_one(&ctx.pool)
        .await
        .expect("comment row")
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
async fn test_friendly_comment_is_pending() {
    let ctx = TestContext::new().await;
    let cookie = ctx.setup_admin().await;
    let post = published_post(&ctx, &cookie).await;

    let response = ctx
        .request(
            Method::POST,
            "/api/comments",
            Some(json!({
                "postId": post["id"],
                "name": "Bob",
                "content": "Great article, thanks for sharing!!!",
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["message"], SUBMISSION_RECEIPT);
    assert_eq!(stored_comment(&ctx).await, (CommentStatus::Pending, false));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
async fn test_spam_comment_is_stored_hidden_with_same_reply() {
    let ctx = TestContext::new().await;
    let cookie = ctx.setup_admin().await;
    let post = published_post(&ctx, &cookie).await;

    let response = ctx
        .request(
            Method::POST,
            "/api/comments",
            Some(json!({
                "postId": post["id"],
                "name": "http://spam.biz",
                "content": "BUY NOW CHEAP VIAGRA CLICK HERE",
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(
        response.body,
        json!({ "success": true, "message": SUBMISSION_RECEIPT })
    );
    assert_eq!(stored_comment(&ctx).await, (CommentStatus::Spam, false));

    let slug = post["slug"].as_str().expect("slug");
    let public = ctx
        .request(Method::GET, &format!("/api/posts/{slug}/comments"), None, None)
        .await;
    assert_eq!(public.body, json!([]));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
async fn test_comment_on_draft_is_not_found() {
    let ctx = TestContext::new().await;
    let cookie = ctx.setup_admin().await;
    let draft = ctx
        .create_post(&cookie, "Unreleased Build", "Coming soon to the shop.", false)
        .await;

    let response = ctx
        .request(
            Method::POST,
            "/api/comments",
            Some(json!({
                "postId": draft["id"],
                "name": "Bob",
                "content": "Can't wait to see this one!",
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(ctx.count("comments").await, 0);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
async fn test_out_of_range_content_is_never_stored() {
    let ctx = TestContext::new().await;
    let cookie = ctx.setup_admin().await;
    let post = published_post(&ctx, &cookie).await;

    for content in ["too short".to_string(), "x".repeat(2001)] {
        let response = ctx
            .request(
                Method::POST,
                "/api/comments",
                Some(json!({ "postId": post["id"], "name": "Bob", "content": content })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }
    assert_eq!(ctx.count("comments").await, 0);
}

// =============================================================================
// Moderation
// =============================================================================

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
async fn test_approving_comment_invalidates_cached_page() {
    let ctx = TestContext::new().await;
    let cookie = ctx.setup_admin().await;
    let post = published_post(&ctx, &cookie).await;
    let slug = post["slug"].as_str().expect("slug").to_string();

    ctx.request(
        Method::POST,
        "/api/comments",
        Some(json!({
            "postId": post["id"],
            "name": "Bob",
            "content": "Which turbo was on the red car?",
        })),
        None,
    )
    .await;

    // Render once so the page is cached without the comment.
    let page = ctx
        .request(Method::GET, &format!("/blog/{slug}"), None, None)
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(!page.text.contains("Which turbo"));
    let key = PageKey::Post(Slug::parse(&slug).expect("slug"));
    assert!(ctx.state.pages().get(&key).await.is_some());

    let queue = ctx
        .request(Method::GET, "/api/admin/comments?status=pending", None, Some(&cookie))
        .await;
    let comment_id = queue.body[0]["id"].as_i64().expect("comment id");

    let response = ctx
        .request(
            Method::PATCH,
            &format!("/api/admin/comments/{comment_id}"),
            Some(json!({ "status": "APPROVED" })),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["approved"], true);
    assert_eq!(response.body["status"], "APPROVED");

    assert!(ctx.state.pages().get(&key).await.is_none());
    let page = ctx
        .request(Method::GET, &format!("/blog/{slug}"), None, None)
        .await;
    assert!(page.text.contains("Which turbo"));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
async fn test_contradictory_moderation_is_rejected() {
    let ctx = TestContext::new().await;
    let cookie = ctx.setup_admin().await;

    let response = ctx
        .request(
            Method::PATCH,
            "/api/admin/comments/1",
            Some(json!({ "approved": true, "status": "SPAM" })),
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
async fn test_bulk_approve() {
    let ctx = TestContext::new().await;
    let cookie = ctx.setup_admin().await;
    let post = published_post(&ctx, &cookie).await;

    for name in ["Ana", "Ben", "Cy"] {
        ctx.request(
            Method::POST,
            "/api/comments",
            Some(json!({
                "postId": post["id"],
                "name": name,
                "content": "Nice numbers on the dyno sheet.",
            })),
            None,
        )
        .await;
    }

    let response = ctx
        .request(
            Method::POST,
            "/api/admin/comments/bulk-approve",
            Some(json!({ "ids": [1, 2, 2, 3, 999] })),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["posts_updated"], 1);

    let approved: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE approved AND status = 'APPROVED'")
            .fetch_one(&ctx.pool)
            .await
            .expect("count");
    assert_eq!(approved, 3);

    let empty = ctx
        .request(
            Method::POST,
            "/api/admin/comments/bulk-approve",
            Some(json!({ "ids": [] })),
            Some(&cookie),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}
