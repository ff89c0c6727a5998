//! Post repository.
//!
//! Writes that touch more than one table run in a single transaction:
//! - create/update: the post row plus a delete-then-insert resync of
//!   `post_images`, so readers never observe a partial image set
//! - delete: comments and images first, then the post

use chrono::{DateTime, Utc};
use redline_core::{PostId, PostImageId, Slug, unique_slug};
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;
use crate::models::post::extract_image_urls;
use crate::models::{NewPost, Post, PostImage, PostUpdate};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: i32,
    title: String,
    slug: String,
    content: String,
    excerpt: Option<String>,
    published: bool,
    thumbnail_url: Option<String>,
    seo_title: Option<String>,
    seo_description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = RepositoryError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let slug = Slug::parse(&row.slug).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "invalid slug for post {}: {}",
                row.id, row.slug
            ))
        })?;

        Ok(Self {
            id: PostId::new(row.id),
            title: row.title,
            slug,
            content: row.content,
            excerpt: row.excerpt,
            published: row.published,
            thumbnail_url: row.thumbnail_url,
            seo_title: row.seo_title,
            seo_description: row.seo_description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PostImageRow {
    id: i32,
    post_id: i32,
    url: String,
    created_at: DateTime<Utc>,
}

impl From<PostImageRow> for PostImage {
    fn from(row: PostImageRow) -> Self {
        Self {
            id: PostImageId::new(row.id),
            post_id: PostId::new(row.post_id),
            url: row.url,
            created_at: row.created_at,
        }
    }
}

const POST_COLUMNS: &str = "id, title, slug, content, excerpt, published, thumbnail_url, \
                            seo_title, seo_description, created_at, updated_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for posts and their image references.
pub struct PostRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PostRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a post with a unique slug derived from its title.
    ///
    /// The first post with a given title keeps the bare slug; later ones get
    /// `-2`, `-3`, ...
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a concurrent insert claimed the
    /// same slug.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, new: &NewPost) -> Result<Post, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let base = Slug::from_title(&new.title);
        let taken: Vec<String> =
            sqlx::query_scalar("SELECT slug FROM posts WHERE slug = $1 OR slug LIKE $1 || '-%'")
                .bind(base.as_str())
                .fetch_all(&mut *tx)
                .await?;
        let slug = unique_slug(&base, taken.iter().map(String::as_str));

        let row: PostRow = sqlx::query_as(&format!(
            "INSERT INTO posts
                 (title, slug, content, excerpt, published, thumbnail_url,
                  seo_title, seo_description)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {POST_COLUMNS}"
        ))
        .bind(&new.title)
        .bind(&slug)
        .bind(&new.content)
        .bind(&new.excerpt)
        .bind(new.published)
        .bind(&new.thumbnail_url)
        .bind(&new.seo_title)
        .bind(&new.seo_description)
        .fetch_one(&mut *tx)
        .await?;

        let post = Post::try_from(row)?;
        replace_images(&mut tx, post.id, &new.image_urls()).await?;
        tx.commit().await?;

        tracing::info!(post_id = %post.id, slug = %post.slug, "Post created");
        Ok(post)
    }

    /// Apply a partial update. The slug never changes.
    ///
    /// When the content is part of the update the image references are
    /// rebuilt from it in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the post does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(&self, id: PostId, update: &PostUpdate) -> Result<Post, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: PostRow = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let title = update.title.clone().unwrap_or(current.title);
        let content = update.content.clone().unwrap_or(current.content);
        let excerpt = update.excerpt.clone().unwrap_or(current.excerpt);
        let published = update.published.unwrap_or(current.published);
        let thumbnail_url = update.thumbnail_url.clone().unwrap_or(current.thumbnail_url);
        let seo_title = update.seo_title.clone().unwrap_or(current.seo_title);
        let seo_description = update
            .seo_description
            .clone()
            .unwrap_or(current.seo_description);

        let row: PostRow = sqlx::query_as(&format!(
            "UPDATE posts
             SET title = $2, content = $3, excerpt = $4, published = $5, thumbnail_url = $6,
                 seo_title = $7, seo_description = $8, updated_at = NOW()
             WHERE id = $1
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(&title)
        .bind(&content)
        .bind(&excerpt)
        .bind(published)
        .bind(&thumbnail_url)
        .bind(&seo_title)
        .bind(&seo_description)
        .fetch_one(&mut *tx)
        .await?;

        if update.content.is_some() {
            replace_images(&mut tx, id, &extract_image_urls(&content)).await?;
        }

        let post = Post::try_from(row)?;
        tx.commit().await?;
        Ok(post)
    }

    /// Delete a post together with its comments and image references.
    ///
    /// Returns the deleted post so callers can invalidate its page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the post does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: PostId) -> Result<Post, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM post_images WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let row: PostRow = sqlx::query_as(&format!(
            "DELETE FROM posts WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        row.try_into()
    }

    /// Get a post by ID, published or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: PostId) -> Result<Option<Post>, RepositoryError> {
        let row: Option<PostRow> =
            sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Get a published post by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_published_by_slug(
        &self,
        slug: &Slug,
    ) -> Result<Option<Post>, RepositoryError> {
        let row: Option<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE slug = $1 AND published = TRUE"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Whether a post exists and is published.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_published(&self, id: PostId) -> Result<bool, RepositoryError> {
        let published: Option<bool> =
            sqlx::query_scalar("SELECT published FROM posts WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(published.unwrap_or(false))
    }

    /// List posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, published_only: bool) -> Result<Vec<Post>, RepositoryError> {
        let rows: Vec<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts
             WHERE ($1 = FALSE OR published = TRUE)
             ORDER BY created_at DESC"
        ))
        .bind(published_only)
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Image references for a post, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images(&self, id: PostId) -> Result<Vec<PostImage>, RepositoryError> {
        let rows: Vec<PostImageRow> = sqlx::query_as(
            "SELECT id, post_id, url, created_at FROM post_images WHERE post_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Replace every image reference of a post. Must run inside a transaction.
async fn replace_images(
    conn: &mut PgConnection,
    post_id: PostId,
    urls: &[String],
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM post_images WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    if !urls.is_empty() {
        sqlx::query(
            "INSERT INTO post_images (post_id, url)
             SELECT $1, url FROM UNNEST($2::text[]) WITH ORDINALITY AS t(url, ord) ORDER BY ord",
        )
        .bind(post_id)
        .bind(urls)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
