//! Post management.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use redline_core::PostId;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::PostRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{NewPost, Post, PostFields, PostImage, PostSummary, PostUpdate};
use crate::state::AppState;

/// Post create/update body. On update, absent fields are left unchanged and
/// an empty string clears an optional field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub published: Option<bool>,
    #[serde(alias = "thumbnail_url")]
    pub thumbnail_url: Option<String>,
    #[serde(alias = "seo_title")]
    pub seo_title: Option<String>,
    #[serde(alias = "seo_description")]
    pub seo_description: Option<String>,
    /// Accepted only so a changed value can be refused.
    pub slug: Option<String>,
}

impl PostRequest {
    fn fields(&self) -> PostFields<'_> {
        PostFields {
            title: self.title.as_deref(),
            content: self.content.as_deref(),
            excerpt: self.excerpt.as_deref(),
            published: self.published,
            thumbnail_url: self.thumbnail_url.as_deref(),
            seo_title: self.seo_title.as_deref(),
            seo_description: self.seo_description.as_deref(),
        }
    }
}

/// A post with the images referenced from its content.
#[derive(Debug, Serialize)]
pub struct AdminPost {
    #[serde(flatten)]
    pub post: Post,
    pub images: Vec<PostImage>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/posts", get(list).post(create))
        .route(
            "/api/admin/posts/{id}",
            get(show).patch(update).delete(destroy),
        )
}

/// All posts, drafts included, newest first.
pub async fn list(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<PostSummary>>> {
    let posts = PostRepository::new(state.pool()).list(false).await?;
    Ok(Json(posts.iter().map(PostSummary::from).collect()))
}

#[instrument(skip_all)]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    body: std::result::Result<Json<PostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>)> {
    let Json(req) = body?;
    let new = NewPost::parse(&req.fields())?;

    let post = PostRepository::new(state.pool()).create(&new).await?;
    if post.published {
        state.pages().invalidate_index().await;
    }

    tracing::info!(post_id = %post.id, user_id = %admin.id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn show(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> Result<Json<AdminPost>> {
    let repo = PostRepository::new(state.pool());
    let post = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post".to_string()))?;
    let images = repo.images(id).await?;
    Ok(Json(AdminPost { post, images }))
}

/// Partial update. The slug is fixed at creation.
#[instrument(skip_all, fields(post_id = %id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<PostId>,
    body: std::result::Result<Json<PostRequest>, JsonRejection>,
) -> Result<Json<Post>> {
    let Json(req) = body?;
    let update = PostUpdate::parse(&req.fields())?;

    let repo = PostRepository::new(state.pool());
    if let Some(slug) = &req.slug {
        let current = repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post".to_string()))?;
        if current.slug.as_str() != slug {
            return Err(AppError::BadRequest(
                "slug cannot be changed after creation".to_string(),
            ));
        }
    }
    if update.is_empty() {
        return Err(AppError::BadRequest("no fields to update".to_string()));
    }

    let post = repo.update(id, &update).await.map_err(not_found_as_post)?;
    state.pages().invalidate_post(&post.slug).await;
    state.pages().invalidate_index().await;

    tracing::info!(user_id = %admin.id, "post updated");
    Ok(Json(post))
}

/// Delete a post along with its comments and image references.
#[instrument(skip_all, fields(post_id = %id))]
pub async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> Result<StatusCode> {
    let post = PostRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found_as_post)?;
    state.pages().invalidate_post(&post.slug).await;
    state.pages().invalidate_index().await;

    tracing::info!(user_id = %admin.id, slug = %post.slug, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn not_found_as_post(err: crate::db::RepositoryError) -> AppError {
    match err {
        crate::db::RepositoryError::NotFound => AppError::NotFound("Post".to_string()),
        other => other.into(),
    }
}
