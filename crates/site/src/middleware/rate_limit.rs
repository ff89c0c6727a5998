//! Rate limiting middleware.
//!
//! One middleware function per endpoint class, each checking the shared
//! [`RateLimiter`] under its preset:
//! - `auth_rate_limit`: login and setup (5 per 15 minutes)
//! - `comment_rate_limit`: comment submission (5 per 10 minutes)
//! - `contact_rate_limit`: contact form and newsletter (3 per 10 minutes)
//! - `write_rate_limit`: admin writes (30 per minute)
//! - `read_rate_limit`: public JSON reads (120 per minute)

use std::net::IpAddr;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, retry_after_secs};
use crate::services::rate_limit::{RateLimitDecision, RateLimitPreset, RateLimiter};
use crate::state::AppState;

/// Identity used when no proxy header carries a client address.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

// =============================================================================
// Client Identity for Cloudflare + Fly.io
// =============================================================================

/// Resolve the caller's address from proxy headers.
///
/// Checks Cloudflare's `CF-Connecting-IP` first, then the first
/// `X-Forwarded-For` entry, `X-Real-IP` and `Fly-Client-IP`. Values that do
/// not parse as an IP address are skipped. Falls back to
/// [`ANONYMOUS_CLIENT`], so all header-less callers share one budget.
#[must_use]
pub fn client_key(headers: &HeaderMap) -> String {
    let header_ip = |name: &str, first_of_list: bool| -> Option<IpAddr> {
        let value = headers.get(name)?.to_str().ok()?;
        let value = if first_of_list {
            value.split(',').next()?
        } else {
            value
        };
        value.trim().parse::<IpAddr>().ok()
    };

    header_ip("cf-connecting-ip", false)
        .or_else(|| header_ip("x-forwarded-for", true))
        .or_else(|| header_ip("x-real-ip", false))
        .or_else(|| header_ip("fly-client-ip", false))
        .map_or_else(|| ANONYMOUS_CLIENT.to_string(), |ip| ip.to_string())
}

/// Check `preset` for the caller and either run the handler or answer 429.
pub async fn enforce(
    limiter: &RateLimiter,
    preset: RateLimitPreset,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(request.headers());

    match limiter.check(preset, &client).await {
        RateLimitDecision::Allowed {
            limit,
            remaining,
            reset_after,
        } => {
            let mut response = next.run(request).await;
            set_headers(response.headers_mut(), limit, remaining, reset_after);
            response
        }
        RateLimitDecision::Limited { limit, retry_after } => {
            tracing::warn!(
                preset = preset.name(),
                client = %client,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            let mut response = AppError::RateLimited { retry_after }.into_response();
            set_headers(response.headers_mut(), limit, 0, retry_after);
            response
        }
    }
}

fn set_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset_after: Duration) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(retry_after_secs(reset_after)));
}

/// Login and setup.
pub async fn auth_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(state.rate_limiter(), RateLimitPreset::Auth, request, next).await
}

/// Public comment submission.
pub async fn comment_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(state.rate_limiter(), RateLimitPreset::Comment, request, next).await
}

/// Contact form and newsletter sign-up.
pub async fn contact_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(state.rate_limiter(), RateLimitPreset::Contact, request, next).await
}

/// Admin writes.
pub async fn write_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(state.rate_limiter(), RateLimitPreset::Write, request, next).await
}

/// Public JSON reads.
pub async fn read_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    enforce(state.rate_limiter(), RateLimitPreset::Read, request, next).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{StatusCode, header},
        middleware::from_fn_with_state,
        routing::post,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::state::tests::test_state;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_client_key_prefers_cloudflare() {
        let map = headers(&[
            ("cf-connecting-ip", "203.0.113.7"),
            ("x-forwarded-for", "198.51.100.1, 10.0.0.1"),
        ]);
        assert_eq!(client_key(&map), "203.0.113.7");
    }

    #[test]
    fn test_client_key_uses_first_forwarded_entry() {
        let map = headers(&[("x-forwarded-for", " 198.51.100.1 , 10.0.0.1")]);
        assert_eq!(client_key(&map), "198.51.100.1");
    }

    #[test]
    fn test_client_key_skips_garbage_and_falls_back() {
        let map = headers(&[
            ("cf-connecting-ip", "unknown"),
            ("fly-client-ip", "2001:db8::1"),
        ]);
        assert_eq!(client_key(&map), "2001:db8::1");

        assert_eq!(client_key(&HeaderMap::new()), ANONYMOUS_CLIENT);
    }

    fn login_router() -> Router {
        let state = test_state();
        Router::new()
            .route(
                "/api/auth/login",
                post(|| async {
                    AppError::Auth(crate::services::auth::AuthError::InvalidCredentials)
                }),
            )
            .layer(from_fn_with_state(state.clone(), auth_rate_limit))
            .with_state(state)
    }

    fn login_request(ip: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header("x-forwarded-for", ip)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"owner@redline.test","password":"wrong-password"}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn test_sixth_login_attempt_is_rate_limited() {
        let app = login_router();

        for attempt in 1..=5u32 {
            let response = app.clone().oneshot(login_request("198.51.100.9")).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "attempt {attempt}");
            assert_eq!(
                response.headers()[&REMAINING_HEADER],
                (5 - attempt).to_string().as_str()
            );
        }

        let response = app.clone().oneshot(login_request("198.51.100.9")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = response.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        // Rounded up from the window plus the boundary millisecond.
        assert!(retry_after > 0 && retry_after <= 15 * 60 + 1);

        // A different client still has its own budget.
        let response = app.oneshot(login_request("198.51.100.10")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
