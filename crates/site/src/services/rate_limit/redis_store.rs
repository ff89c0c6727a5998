//! Redis-backed fixed-bucket counter store.

use std::time::Duration;

use redis::AsyncCommands;
use tokio::time::timeout;

use super::{RateLimitDecision, RateLimitError, RateLimitPolicy, millis};

/// Upper bound on a single check, connection included.
const STORE_TIMEOUT: Duration = Duration::from_millis(250);

/// Counter per `(scope, identifier, floor(now / window))`, expiring with the
/// window.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    prefix: String,
}

impl RedisStore {
    /// Create a store. Does not connect until the first check.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(url: &str, prefix: &str) -> Result<Self, RateLimitError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            prefix: prefix.to_string(),
        })
    }

    /// Counter key for the bucket containing `now_ms`.
    #[must_use]
    pub fn bucket_key(&self, scope: &str, identifier: &str, window_ms: i64, now_ms: i64) -> String {
        let bucket = now_ms.div_euclid(window_ms);
        format!("{}:rl:{scope}:{identifier}:{bucket}", self.prefix)
    }

    /// Increment the current bucket and decide.
    ///
    /// # Errors
    ///
    /// Returns an error if Redis is unreachable, fails, or takes longer than
    /// the store timeout.
    pub async fn check(
        &self,
        scope: &str,
        identifier: &str,
        policy: RateLimitPolicy,
        now_ms: i64,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let window_ms = policy.window_ms();
        let key = self.bucket_key(scope, identifier, window_ms, now_ms);

        let count = timeout(STORE_TIMEOUT, async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            let count: i64 = conn.incr(&key, 1_i64).await?;
            if count == 1 {
                let _: bool = conn.pexpire(&key, window_ms).await?;
            }
            Ok::<_, redis::RedisError>(count)
        })
        .await
        .map_err(|_| RateLimitError::Timeout)??;

        Ok(decide(policy, count, window_ms, now_ms))
    }
}

/// Turn a bucket count into a decision. The bucket resets at its boundary.
fn decide(policy: RateLimitPolicy, count: i64, window_ms: i64, now_ms: i64) -> RateLimitDecision {
    let limit = policy.max_requests;
    let reset = millis(window_ms - now_ms.rem_euclid(window_ms));

    if count <= i64::from(limit) {
        let remaining = u32::try_from(i64::from(limit) - count).unwrap_or(0);
        RateLimitDecision::Allowed {
            limit,
            remaining,
            reset_after: reset,
        }
    } else {
        RateLimitDecision::Limited {
            limit,
            retry_after: reset,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_key_changes_at_window_boundary() {
        let store = RedisStore::new("redis://127.0.0.1/", "redline").unwrap();
        let a = store.bucket_key("auth", "1.2.3.4", 60_000, 119_999);
        let b = store.bucket_key("auth", "1.2.3.4", 60_000, 120_000);
        assert_eq!(a, "redline:rl:auth:1.2.3.4:1");
        assert_eq!(b, "redline:rl:auth:1.2.3.4:2");
    }

    #[test]
    fn test_decide_admits_up_to_limit() {
        let policy = RateLimitPolicy::new(Duration::from_secs(60), 5);
        assert_eq!(
            decide(policy, 5, 60_000, 90_000),
            RateLimitDecision::Allowed {
                limit: 5,
                remaining: 0,
                reset_after: Duration::from_secs(30)
            }
        );
        assert_eq!(
            decide(policy, 6, 60_000, 90_000),
            RateLimitDecision::Limited {
                limit: 5,
                retry_after: Duration::from_secs(30)
            }
        );
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(RedisStore::new("not a url", "redline").is_err());
    }
}
