//! Process-local sliding-window store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::{RateLimitDecision, RateLimitPolicy, millis};

/// First instant at which a hit recorded at `hit_ms` no longer counts.
const fn expires_at(hit_ms: i64, window_ms: i64) -> i64 {
    hit_ms + window_ms + 1
}

#[derive(Debug, Default)]
struct Window {
    window_ms: i64,
    /// Admitted call times, oldest first.
    hits: Vec<i64>,
}

/// Per-identifier timestamp lists behind a single mutex.
///
/// Each check holds the lock for prune + count + append, so concurrent calls
/// from one identifier cannot both take the last slot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    windows: Mutex<HashMap<String, Window>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and record one call at `now_ms`.
    ///
    /// Hits older than the window are pruned first; the call is rejected once
    /// the remaining hits reach `max_requests`, otherwise it is recorded.
    pub fn check(&self, key: &str, policy: RateLimitPolicy, now_ms: i64) -> RateLimitDecision {
        let window_ms = policy.window_ms();
        let limit = policy.max_requests;

        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let entry = windows.entry(key.to_owned()).or_default();
        entry.window_ms = window_ms;

        // Hits in [now - window, now) count against the budget.
        let cutoff = now_ms - window_ms;
        entry.hits.retain(|&t| t >= cutoff);

        let used = u32::try_from(entry.hits.len()).unwrap_or(u32::MAX);
        if used >= limit {
            let oldest = entry.hits.first().copied().unwrap_or(now_ms);
            return RateLimitDecision::Limited {
                limit,
                retry_after: millis(expires_at(oldest, window_ms) - now_ms)
                    .max(Duration::from_millis(1)),
            };
        }

        entry.hits.push(now_ms);
        let oldest = entry.hits.first().copied().unwrap_or(now_ms);
        RateLimitDecision::Allowed {
            limit,
            remaining: limit - used - 1,
            reset_after: millis(expires_at(oldest, window_ms) - now_ms),
        }
    }

    /// Remove identifiers with no hits inside their window. Returns how many
    /// were removed.
    pub fn sweep(&self, now_ms: i64) -> usize {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|_, w| w.hits.last().is_some_and(|&t| t >= now_ms - w.window_ms));
        before - windows.len()
    }

    /// Number of tracked identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
