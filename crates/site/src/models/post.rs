//! Blog posts and the image references embedded in them.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use redline_core::{PostId, PostImageId, Slug};
use regex::Regex;
use serde::Serialize;

use super::{ValidationError, bounded_text, optional_text};

pub const TITLE_MAX: usize = 200;
pub const CONTENT_MAX: usize = 100_000;
pub const EXCERPT_MAX: usize = 500;
pub const SEO_TITLE_MAX: usize = 120;
pub const SEO_DESCRIPTION_MAX: usize = 320;

/// Markdown image syntax: `![alt](url "title")`.
static MARKDOWN_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#).expect("Invalid regex")
});

/// Raw HTML image tags with a quoted `src`.
static HTML_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("Invalid regex")
});

/// A blog article.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub slug: Slug,
    pub content: String,
    pub excerpt: Option<String>,
    pub published: bool,
    pub thumbnail_url: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing view of a post.
#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub id: PostId,
    pub title: String,
    pub slug: Slug,
    pub excerpt: Option<String>,
    pub published: bool,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Post> for PostSummary {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            slug: post.slug.clone(),
            excerpt: post.excerpt.clone(),
            published: post.published,
            thumbnail_url: post.thumbnail_url.clone(),
            created_at: post.created_at,
        }
    }
}

/// An image URL referenced from a post's content.
#[derive(Debug, Clone, Serialize)]
pub struct PostImage {
    pub id: PostImageId,
    pub post_id: PostId,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// A validated post creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub published: bool,
    pub thumbnail_url: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
}

/// Raw post fields as submitted by the admin API.
#[derive(Debug, Clone, Default)]
pub struct PostFields<'a> {
    pub title: Option<&'a str>,
    pub content: Option<&'a str>,
    pub excerpt: Option<&'a str>,
    pub published: Option<bool>,
    pub thumbnail_url: Option<&'a str>,
    pub seo_title: Option<&'a str>,
    pub seo_description: Option<&'a str>,
}

impl NewPost {
    /// Validate a creation request. Title and content are required.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for missing or over-long fields and for a
    /// thumbnail that is not an absolute http(s) URL.
    pub fn parse(fields: &PostFields<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            title: bounded_text("title", fields.title.unwrap_or_default(), 1, TITLE_MAX)?,
            content: bounded_text("content", fields.content.unwrap_or_default(), 1, CONTENT_MAX)?,
            excerpt: optional_text("excerpt", fields.excerpt, EXCERPT_MAX)?,
            published: fields.published.unwrap_or(false),
            thumbnail_url: optional_url("thumbnail_url", fields.thumbnail_url)?,
            seo_title: optional_text("seo_title", fields.seo_title, SEO_TITLE_MAX)?,
            seo_description: optional_text(
                "seo_description",
                fields.seo_description,
                SEO_DESCRIPTION_MAX,
            )?,
        })
    }

    /// Image URLs referenced by the content.
    #[must_use]
    pub fn image_urls(&self) -> Vec<String> {
        extract_image_urls(&self.content)
    }
}

/// A validated partial update.
///
/// `None` leaves a field unchanged; for nullable fields `Some(None)` clears it.
/// There is deliberately no slug field: slugs are fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<Option<String>>,
    pub published: Option<bool>,
    pub thumbnail_url: Option<Option<String>>,
    pub seo_title: Option<Option<String>>,
    pub seo_description: Option<Option<String>>,
}

impl PostUpdate {
    /// Validate an update request. Absent fields are left alone; blank
    /// nullable fields are cleared.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] under the same rules as [`NewPost::parse`].
    pub fn parse(fields: &PostFields<'_>) -> Result<Self, ValidationError> {
        Ok(Self {
            title: fields
                .title
                .map(|t| bounded_text("title", t, 1, TITLE_MAX))
                .transpose()?,
            content: fields
                .content
                .map(|c| bounded_text("content", c, 1, CONTENT_MAX))
                .transpose()?,
            excerpt: fields
                .excerpt
                .map(|e| optional_text("excerpt", Some(e), EXCERPT_MAX))
                .transpose()?,
            published: fields.published,
            thumbnail_url: fields
                .thumbnail_url
                .map(|u| optional_url("thumbnail_url", Some(u)))
                .transpose()?,
            seo_title: fields
                .seo_title
                .map(|t| optional_text("seo_title", Some(t), SEO_TITLE_MAX))
                .transpose()?,
            seo_description: fields
                .seo_description
                .map(|d| optional_text("seo_description", Some(d), SEO_DESCRIPTION_MAX))
                .transpose()?,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Collect image URLs from markdown `![](...)` and inline `<img src>` tags,
/// de-duplicated in order of first appearance.
#[must_use]
pub fn extract_image_urls(content: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    let captures = MARKDOWN_IMAGE_RE
        .captures_iter(content)
        .chain(HTML_IMAGE_RE.captures_iter(content));

    for caps in captures {
        if let Some(url) = caps.get(1).map(|m| m.as_str().trim())
            && !url.is_empty()
            && !urls.iter().any(|u| u == url)
        {
            urls.push(url.to_owned());
        }
    }
    urls
}

fn optional_url(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    let Some(raw) = optional_text(field, value, 2048)? else {
        return Ok(None);
    };
    match url::Url::parse(&raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(Some(raw)),
        _ => Err(ValidationError::Invalid(format!(
            "{field} must be an http(s) URL"
        ))),
    }
}
