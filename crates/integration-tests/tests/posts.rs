//! Post management and public visibility.

use axum::http::{Method, StatusCode};
use redline_integration_tests::TestContext;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
async fn test_duplicate_titles_get_suffixed_slugs() {
    let ctx = TestContext::new().await;
    let cookie = ctx.setup_admin().await;

    let first = ctx
        .create_post(&cookie, "Dyno Day!", "First write-up.", true)
        .await;
    let second = ctx
        .create_post(&cookie, "Dyno Day!", "Second write-up.", true)
        .await;
    let third = ctx
        .create_post(&cookie, "dyno day", "Third write-up.", false)
        .await;

    assert_eq!(first["slug"], "dyno-day");
    assert_eq!(second["slug"], "dyno-day-2");
    assert_eq!(third["slug"], "dyno-day-3");
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
async fn test_slug_is_immutable() {
    let ctx = TestContext::new().await;
    let cookie = ctx.setup_admin().await;
    let post = ctx
        .create_post(&cookie, "Exhaust Swap", "Straight pipes.", true)
        .await;
    let id = &post["id"];

    let renamed = ctx
        .request(
            Method::PATCH,
            &format!("/api/admin/posts/{id}"),
            Some(json!({ "title": "Full Exhaust Swap" })),
            Some(&cookie),
        )
        .await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.body["title"], "Full Exhaust Swap");
    assert_eq!(renamed.body["slug"], "exhaust-swap");

    let reslug = ctx
        .request(
            Method::PATCH,
            &format!("/api/admin/posts/{id}"),
            Some(json!({ "slug": "something-else" })),
            Some(&cookie),
        )
        .await;
    assert_eq!(reslug.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
async fn test_images_are_tracked_from_content() {
    let ctx = TestContext::new().await;
    let cookie = ctx.setup_admin().await;
    let post = ctx
        .create_post(
            &cookie,
            "Build Gallery",
            concat!(
                "![front](https://res.cloudinary.com/demo/a.jpg)\n\n",
                "<img src=\"https://res.cloudinary.com/demo/b.png\">",
            ),
            true,
        )
        .await;
    let id = &post["id"];

    let detail = ctx
        .request(Method::GET, &format!("/api/admin/posts/{id}"), None, Some(&cookie))
        .await;
    assert_eq!(detail.body["images"].as_array().map(Vec::len), Some(2));

    ctx.request(
        Method::PATCH,
        &format!("/api/admin/posts/{id}"),
        Some(json!({ "content": "No pictures any more." })),
        Some(&cookie),
    )
    .await;
    assert_eq!(ctx.count("post_images").await, 0);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
async fn test_delete_post_removes_children() {
    let ctx = TestContext::new().await;
    let cookie = ctx.setup_admin().await;
    let post = ctx
        .create_post(
            &cookie,
            "Short Lived",
            "![shot](https://res.cloudinary.com/demo/c.jpg)",
            true,
        )
        .await;
    ctx.request(
        Method::POST,
        "/api/comments",
        Some(json!({
            "postId": post["id"],
            "name": "Bob",
            "content": "Sad to see this one go.",
        })),
        None,
    )
    .await;
    assert_eq!(ctx.count("comments").await, 1);

    let response = ctx
        .request(
            Method::DELETE,
            &format!("/api/admin/posts/{}", post["id"]),
            None,
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    assert_eq!(ctx.count("posts").await, 0);
    assert_eq!(ctx.count("comments").await, 0);
    assert_eq!(ctx.count("post_images").await, 0);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
async fn test_drafts_are_not_public() {
    let ctx = TestContext::new().await;
    let cookie = ctx.setup_admin().await;
    ctx.create_post(&cookie, "Live Post", "Everyone can read this.", true)
        .await;
    ctx.create_post(&cookie, "Draft Post", "Nobody should see this.", false)
        .await;

    let list = ctx.request(Method::GET, "/api/posts", None, None).await;
    let titles: Vec<&str> = list
        .body
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|p| p["title"].as_str())
        .collect();
    assert_eq!(titles, ["Live Post"]);

    let draft = ctx
        .request(Method::GET, "/blog/draft-post", None, None)
        .await;
    assert_eq!(draft.status, StatusCode::NOT_FOUND);

    let index = ctx.request(Method::GET, "/blog", None, None).await;
    assert!(index.text.contains("Live Post"));
    assert!(!index.text.contains("Draft Post"));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
async fn test_publishing_refreshes_cached_index() {
    let ctx = TestContext::new().await;
    let cookie = ctx.setup_admin().await;
    let draft = ctx
        .create_post(&cookie, "Coming Soon", "Almost ready.", false)
        .await;

    let before = ctx.request(Method::GET, "/blog", None, None).await;
    assert!(!before.text.contains("Coming Soon"));

    ctx.request(
        Method::PATCH,
        &format!("/api/admin/posts/{}", draft["id"]),
        Some(json!({ "published": true })),
        Some(&cookie),
    )
    .await;

    let after = ctx.request(Method::GET, "/blog", None, None).await;
    assert!(after.text.contains("Coming Soon"));
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
async fn test_contact_and_newsletter() {
    let ctx = TestContext::new().await;

    let contact = ctx
        .request(
            Method::POST,
            "/api/contact",
            Some(json!({
                "name": "Sam <b>Driver</b>",
                "email": "sam@example.com",
                "message": "<script>alert(1)</script>Quote for a stage 2 tune?",
            })),
            None,
        )
        .await;
    assert_eq!(contact.status, StatusCode::CREATED);
    let (name, message): (String, String) =
        sqlx::query_as("SELECT name, message FROM contact_messages")
            .fetch_one(&ctx.pool)
            .await
            .expect("message row");
    assert_eq!(name, "Sam Driver");
    assert_eq!(message, "Quote for a stage 2 tune?");

    for email in ["fan@example.com", "FAN@example.com"] {
        let response = ctx
            .request(Method::POST, "/api/newsletter", Some(json!({ "email": email })), None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }
    assert_eq!(ctx.count("subscribers").await, 1);
}
