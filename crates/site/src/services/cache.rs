//! Rendered-page cache for the public blog.
//!
//! Pages are cached with a TTL as a backstop, but every write that changes
//! what a visitor would see (post edits, moderation) invalidates explicitly.
//!
//! Rendering reads the database and only then stores the page, so an
//! invalidation can land in between. Each render takes a [`PageTicket`]
//! first; a page whose ticket predates the latest invalidation is served but
//! never stored.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use redline_core::Slug;

/// Cache key for a public page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageKey {
    /// `/blog`
    Index,
    /// `/blog/{slug}`
    Post(Slug),
}

/// Invalidation epoch observed before a page was rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct PageTicket(u64);

/// Shared cache of rendered HTML.
#[derive(Clone)]
pub struct PageCache {
    pages: Cache<PageKey, Arc<str>>,
    epoch: Arc<AtomicU64>,
}

impl PageCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let pages = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();
        Self {
            pages,
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn get(&self, key: &PageKey) -> Option<Arc<str>> {
        self.pages.get(key).await
    }

    /// Take before reading the data a page is rendered from.
    pub fn ticket(&self) -> PageTicket {
        PageTicket(self.epoch.load(Ordering::SeqCst))
    }

    /// Store a rendered page unless an invalidation happened after `ticket`
    /// was taken. The HTML is returned either way.
    pub async fn insert(&self, key: PageKey, html: String, ticket: PageTicket) -> Arc<str> {
        let html: Arc<str> = Arc::from(html);
        if self.ticket() != ticket {
            tracing::debug!(?key, "skipped caching a page rendered before an invalidation");
            return html;
        }

        self.pages.insert(key.clone(), Arc::clone(&html)).await;
        // An invalidation may have run between the check and the insert.
        if self.ticket() != ticket {
            self.pages.invalidate(&key).await;
        }
        html
    }

    /// Drop a post's page.
    pub async fn invalidate_post(&self, slug: &Slug) {
        self.invalidate(&PageKey::Post(slug.clone())).await;
        tracing::debug!(slug = %slug, "invalidated cached post page");
    }

    /// Drop the blog index.
    pub async fn invalidate_index(&self) {
        self.invalidate(&PageKey::Index).await;
    }

    async fn invalidate(&self, key: &PageKey) {
        // Bump first so renders already in flight cannot store their page.
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.pages.invalidate(key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slug(s: &str) -> Slug {
        Slug::parse(s).unwrap_or_else(|| Slug::from_title(s))
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let cache = PageCache::new(Duration::from_secs(60));
        cache
            .insert(
                PageKey::Post(slug("dyno-day")),
                "<h1>Dyno</h1>".to_string(),
                cache.ticket(),
            )
            .await;

        let html = cache.get(&PageKey::Post(slug("dyno-day"))).await;
        assert_eq!(html.as_deref(), Some("<h1>Dyno</h1>"));
        assert!(cache.get(&PageKey::Index).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_post_leaves_other_pages() {
        let cache = PageCache::new(Duration::from_secs(60));
        cache
            .insert(PageKey::Index, "index".to_string(), cache.ticket())
            .await;
        cache
            .insert(PageKey::Post(slug("track-day")), "a".to_string(), cache.ticket())
            .await;
        cache
            .insert(PageKey::Post(slug("track-day-2")), "b".to_string(), cache.ticket())
            .await;

        cache.invalidate_post(&slug("track-day")).await;

        assert!(cache.get(&PageKey::Post(slug("track-day"))).await.is_none());
        assert!(cache.get(&PageKey::Post(slug("track-day-2"))).await.is_some());
        assert!(cache.get(&PageKey::Index).await.is_some());

        cache.invalidate_index().await;
        assert!(cache.get(&PageKey::Index).await.is_none());
    }

    #[tokio::test]
    async fn test_render_overtaken_by_invalidation_is_not_stored() {
        let cache = PageCache::new(Duration::from_secs(60));
        let key = PageKey::Post(slug("dyno-day"));

        let ticket = cache.ticket();
        // Moderation lands while the page is being rendered.
        cache.invalidate_post(&slug("dyno-day")).await;
        let html = cache
            .insert(key.clone(), "<p>stale</p>".to_string(), ticket)
            .await;

        assert_eq!(&*html, "<p>stale</p>");
        assert!(cache.get(&key).await.is_none());

        // The next render starts after the invalidation and is cached.
        cache
            .insert(key.clone(), "<p>fresh</p>".to_string(), cache.ticket())
            .await;
        assert_eq!(cache.get(&key).await.as_deref(), Some("<p>fresh</p>"));
    }
}
