//! Public post API.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use redline_core::Slug;
use serde::Serialize;

use crate::db::{CommentRepository, PostRepository};
use crate::error::{AppError, Result};
use crate::models::{Post, PostSummary, PublicComment};
use crate::state::AppState;

/// A published post with its comment count.
#[derive(Debug, Serialize)]
pub struct PublicPost {
    #[serde(flatten)]
    pub post: Post,
    pub comment_count: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list))
        .route("/api/posts/{slug}", get(show))
        .route("/api/posts/{slug}/comments", get(comments))
}

/// GET /api/posts
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<PostSummary>>> {
    let posts = PostRepository::new(state.pool()).list(true).await?;
    Ok(Json(posts.iter().map(PostSummary::from).collect()))
}

/// GET /api/posts/{slug}
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PublicPost>> {
    let post = published_post(&state, &slug).await?;
    let comment_count = CommentRepository::new(state.pool())
        .list_public(post.id)
        .await?
        .len();
    Ok(Json(PublicPost {
        post,
        comment_count,
    }))
}

/// Approved comments on a published post, oldest first.
///
/// GET /api/posts/{slug}/comments
pub async fn comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<PublicComment>>> {
    let post = published_post(&state, &slug).await?;
    let comments = CommentRepository::new(state.pool())
        .list_public(post.id)
        .await?;
    Ok(Json(comments.into_iter().map(PublicComment::from).collect()))
}

async fn published_post(state: &AppState, slug: &str) -> Result<Post> {
    let not_found = || AppError::NotFound("Post".to_string());
    let slug = Slug::parse(slug).ok_or_else(not_found)?;
    PostRepository::new(state.pool())
        .get_published_by_slug(&slug)
        .await?
        .ok_or_else(not_found)
}
