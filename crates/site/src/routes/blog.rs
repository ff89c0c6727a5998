//! Public blog pages.
//!
//! Rendered HTML is cached per page in [`PageCache`]; moderation and post
//! writes invalidate the affected entries.
//!
//! [`PageCache`]: crate::services::cache::PageCache

use askama::Template;
use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use comrak::{Options, markdown_to_html};
use redline_core::Slug;
use tracing::instrument;

use crate::db::{CommentRepository, PostRepository};
use crate::error::{AppError, Result};
use crate::models::{Post, PublicComment};
use crate::services::cache::PageKey;
use crate::state::AppState;

/// Browsers may reuse a page briefly; the server-side cache does the rest.
const PAGE_CACHE_CONTROL: &str = "public, max-age=60";

/// Post view for templates.
pub struct PostView {
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub thumbnail_url: Option<String>,
    pub published_on: String,
    pub content_html: String,
}

impl PostView {
    fn summary(post: &Post) -> Self {
        Self {
            slug: post.slug.to_string(),
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            thumbnail_url: post.thumbnail_url.clone(),
            published_on: format_date(post.created_at),
            content_html: String::new(),
        }
    }

    fn full(post: &Post) -> Self {
        Self {
            content_html: render_markdown(&post.content),
            ..Self::summary(post)
        }
    }
}

/// Approved comment view for templates.
pub struct CommentView {
    pub name: String,
    pub content: String,
    pub posted_on: String,
}

impl From<PublicComment> for CommentView {
    fn from(comment: PublicComment) -> Self {
        Self {
            name: comment.name,
            content: comment.content,
            posted_on: format_date(comment.created_at),
        }
    }
}

/// Blog index page template.
#[derive(Template)]
#[template(path = "blog/index.html")]
pub struct BlogIndexTemplate {
    pub posts: Vec<PostView>,
    pub base_url: String,
}

/// Blog post detail template.
#[derive(Template)]
#[template(path = "blog/show.html")]
pub struct BlogShowTemplate {
    pub post: PostView,
    pub seo_title: String,
    pub seo_description: Option<String>,
    pub comments: Vec<CommentView>,
    pub base_url: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/blog", get(index))
        .route("/blog/{slug}", get(show))
}

/// Display the blog index with all published posts.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Response> {
    if let Some(html) = state.pages().get(&PageKey::Index).await {
        return Ok(page(&html));
    }

    let ticket = state.pages().ticket();
    let posts = PostRepository::new(state.pool()).list(true).await?;
    let html = BlogIndexTemplate {
        posts: posts.iter().map(PostView::summary).collect(),
        base_url: state.config().base_url.clone(),
    }
    .render()
    .map_err(|e| AppError::Internal(format!("render blog index: {e}")))?;

    let html = state.pages().insert(PageKey::Index, html, ticket).await;
    Ok(page(&html))
}

/// Display a single published post with its approved comments.
///
/// # Errors
///
/// Returns 404 if the post doesn't exist or is unpublished.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Response> {
    let slug = Slug::parse(&slug).ok_or_else(|| AppError::NotFound("Post".to_string()))?;
    let key = PageKey::Post(slug.clone());
    if let Some(html) = state.pages().get(&key).await {
        return Ok(page(&html));
    }

    let ticket = state.pages().ticket();
    let post = PostRepository::new(state.pool())
        .get_published_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;
    let comments = CommentRepository::new(state.pool())
        .list_public(post.id)
        .await?;

    let html = BlogShowTemplate {
        seo_title: post.seo_title.clone().unwrap_or_else(|| post.title.clone()),
        seo_description: post.seo_description.clone().or_else(|| post.excerpt.clone()),
        post: PostView::full(&post),
        comments: comments
            .into_iter()
            .map(|c| CommentView::from(PublicComment::from(c)))
            .collect(),
        base_url: state.config().base_url.clone(),
    }
    .render()
    .map_err(|e| AppError::Internal(format!("render post {slug}: {e}")))?;

    let html = state.pages().insert(key, html, ticket).await;
    Ok(page(&html))
}

fn page(html: &str) -> Response {
    let mut response = Html(html.to_owned()).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(PAGE_CACHE_CONTROL),
    );
    response
}

fn format_date(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

/// Render post markdown with GitHub Flavored Markdown extensions.
///
/// Post bodies are written by the site operator, so raw HTML is passed
/// through.
fn render_markdown(content: &str) -> String {
    let mut options = Options::default();

    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.header_ids = Some(String::new());
    options.extension.footnotes = true;

    options.render.r#unsafe = true;

    markdown_to_html(content, &options)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::state::tests::test_state;

    #[test]
    fn test_render_markdown_gfm() {
        let html =
            render_markdown("# Dyno day\n\n| hp | tq |\n|---|---|\n| 410 | 380 |\n\n~~old~~");
        assert!(html.contains("<h1>"));
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>old</del>"));
    }

    #[test]
    fn test_format_date() {
        let at = DateTime::parse_from_rfc3339("2026-03-07T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_date(at), "March 7, 2026");
    }

    #[test]
    fn test_index_template_renders_posts() {
        let html = BlogIndexTemplate {
            posts: vec![PostView {
                slug: "stage-2-tune".to_string(),
                title: "Stage 2 <Tune>".to_string(),
                excerpt: Some("More boost".to_string()),
                thumbnail_url: None,
                published_on: "March 7, 2026".to_string(),
                content_html: String::new(),
            }],
            base_url: "http://localhost:3000".to_string(),
        }
        .render()
        .unwrap();

        assert!(html.contains("/blog/stage-2-tune"));
        assert!(html.contains("Stage 2 &#60;Tune&#62;") || html.contains("Stage 2 &lt;Tune&gt;"));
    }

    #[tokio::test]
    async fn test_cached_page_is_served_without_database() {
        let state = test_state();
        let slug = Slug::parse("dyno-day").unwrap();
        state
            .pages()
            .insert(
                PageKey::Post(slug),
                "<p>cached</p>".to_string(),
                state.pages().ticket(),
            )
            .await;

        let response = router()
            .with_state(state)
            .oneshot(
                Request::builder()
                    .uri("/blog/dyno-day")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], PAGE_CACHE_CONTROL);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"<p>cached</p>");
    }

    #[tokio::test]
    async fn test_malformed_slug_is_not_found() {
        let response = router()
            .with_state(test_state())
            .oneshot(
                Request::builder()
                    .uri("/blog/NOT%20A%20SLUG")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
