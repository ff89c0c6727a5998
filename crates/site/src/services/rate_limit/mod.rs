//! Sliding-window rate limiting.
//!
//! Two stores implement the same admit/reject contract:
//!
//! - [`MemoryStore`] keeps recent call timestamps per identifier. Exact, but
//!   per-process: with several instances each enforces its own budget.
//! - [`RedisStore`] keeps one `INCR` counter per `(identifier, window bucket)`.
//!   Shared across instances; a caller can get up to twice the budget across a
//!   bucket boundary.
//!
//! Store failures follow the configured [`FailMode`]. The default is to admit
//! (fail open) and log a warning.

mod memory;
mod redis_store;

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Endpoint classes with their own budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitPreset {
    /// Login and setup.
    Auth,
    /// Public comment submission.
    Comment,
    /// Contact form and newsletter sign-up.
    Contact,
    /// Admin writes (posts, moderation, images).
    Write,
    /// Public JSON reads.
    Read,
}

impl RateLimitPreset {
    /// The default policy for this preset.
    #[must_use]
    pub const fn policy(self) -> RateLimitPolicy {
        match self {
            Self::Auth => RateLimitPolicy::new(Duration::from_secs(15 * 60), 5),
            Self::Comment => RateLimitPolicy::new(Duration::from_secs(10 * 60), 5),
            Self::Contact => RateLimitPolicy::new(Duration::from_secs(10 * 60), 3),
            Self::Write => RateLimitPolicy::new(Duration::from_secs(60), 30),
            Self::Read => RateLimitPolicy::new(Duration::from_secs(60), 120),
        }
    }

    /// Short name used in store keys and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Comment => "comment",
            Self::Contact => "contact",
            Self::Write => "write",
            Self::Read => "read",
        }
    }
}

/// At most `max_requests` admitted calls per rolling `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_requests: u32,
}

impl RateLimitPolicy {
    #[must_use]
    pub const fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
        }
    }

    /// Window length in milliseconds, never zero.
    #[must_use]
    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX).max(1)
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        limit: u32,
        remaining: u32,
        reset_after: Duration,
    },
    Limited {
        limit: u32,
        retry_after: Duration,
    },
}

impl RateLimitDecision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// What to do when the counter store is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailMode {
    /// Admit the request.
    #[default]
    Open,
    /// Reject the request as if the limit were reached.
    Closed,
}

/// Rate limit store failure.
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit store timed out")]
    Timeout,
    #[error("rate limit store error: {0}")]
    Store(#[from] redis::RedisError),
}

#[derive(Clone)]
enum Backend {
    Memory(Arc<MemoryStore>),
    Redis(RedisStore),
}

/// Rate limiter shared by every request handler.
///
/// Constructed once at start-up and carried in the application state.
#[derive(Clone)]
pub struct RateLimiter {
    backend: Backend,
    fail_mode: FailMode,
}

impl RateLimiter {
    /// A limiter backed by process-local memory.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::new())),
            fail_mode: FailMode::Open,
        }
    }

    /// A limiter backed by Redis.
    #[must_use]
    pub const fn redis(store: RedisStore, fail_mode: FailMode) -> Self {
        Self {
            backend: Backend::Redis(store),
            fail_mode,
        }
    }

    /// Check and record one call from `identifier` under `preset`.
    pub async fn check(&self, preset: RateLimitPreset, identifier: &str) -> RateLimitDecision {
        self.check_policy(preset.name(), preset.policy(), identifier)
            .await
    }

    /// Check and record one call under an explicit policy.
    ///
    /// `scope` keeps budgets of different endpoint classes apart.
    pub async fn check_policy(
        &self,
        scope: &str,
        policy: RateLimitPolicy,
        identifier: &str,
    ) -> RateLimitDecision {
        let now_ms = unix_millis();
        match &self.backend {
            Backend::Memory(store) => {
                store.check(&format!("{scope}:{identifier}"), policy, now_ms)
            }
            Backend::Redis(store) => match store.check(scope, identifier, policy, now_ms).await {
                Ok(decision) => decision,
                Err(e) => self.on_store_failure(scope, policy, &e),
            },
        }
    }

    fn on_store_failure(
        &self,
        scope: &str,
        policy: RateLimitPolicy,
        error: &RateLimitError,
    ) -> RateLimitDecision {
        match self.fail_mode {
            FailMode::Open => {
                tracing::warn!(
                    scope,
                    error = %error,
                    "Rate limit store unavailable, admitting request"
                );
                RateLimitDecision::Allowed {
                    limit: policy.max_requests,
                    remaining: policy.max_requests,
                    reset_after: policy.window,
                }
            }
            FailMode::Closed => {
                tracing::warn!(
                    scope,
                    error = %error,
                    "Rate limit store unavailable, rejecting request"
                );
                RateLimitDecision::Limited {
                    limit: policy.max_requests,
                    retry_after: Duration::from_secs(1),
                }
            }
        }
    }

    /// Drop idle in-memory entries. No-op for the redis backend, whose keys
    /// expire on their own.
    pub fn sweep(&self) -> usize {
        match &self.backend {
            Backend::Memory(store) => store.sweep(unix_millis()),
            Backend::Redis(_) => 0,
        }
    }
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Convert a non-negative millisecond span to a `Duration`.
fn millis(ms: i64) -> Duration {
    Duration::from_millis(u64::try_from(ms.max(0)).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_preset_is_five_per_fifteen_minutes() {
        let policy = RateLimitPreset::Auth.policy();
        assert_eq!(policy.max_requests, 5);
        assert_eq!(policy.window, Duration::from_secs(900));
    }

    #[test]
    fn test_reads_are_more_relaxed_than_writes() {
        let read = RateLimitPreset::Read.policy();
        let comment = RateLimitPreset::Comment.policy();
        assert!(read.max_requests > comment.max_requests);
        assert!(read.window <= comment.window);
    }

    #[tokio::test]
    async fn test_presets_have_separate_budgets() {
        let limiter = RateLimiter::memory();
        for _ in 0..5 {
            assert!(limiter.check(RateLimitPreset::Auth, "10.0.0.1").await.is_allowed());
        }
        assert!(!limiter.check(RateLimitPreset::Auth, "10.0.0.1").await.is_allowed());
        assert!(limiter.check(RateLimitPreset::Read, "10.0.0.1").await.is_allowed());
        assert!(limiter.check(RateLimitPreset::Auth, "10.0.0.2").await.is_allowed());
    }

    #[tokio::test]
    async fn test_unreachable_redis_fails_open_by_default() {
        let store = RedisStore::new("redis://127.0.0.1:1/", "redline-test").unwrap_or_else(|e| {
            panic!("client construction does not connect: {e}")
        });
        let limiter = RateLimiter::redis(store, FailMode::Open);
        let decision = limiter.check(RateLimitPreset::Comment, "10.0.0.1").await;
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn test_unreachable_redis_fails_closed_when_configured() {
        let store = RedisStore::new("redis://127.0.0.1:1/", "redline-test").unwrap_or_else(|e| {
            panic!("client construction does not connect: {e}")
        });
        let limiter = RateLimiter::redis(store, FailMode::Closed);
        let decision = limiter.check(RateLimitPreset::Comment, "10.0.0.1").await;
        assert!(!decision.is_allowed());
    }
}
