//! Session cookie handling and authentication extractors.
//!
//! The cookie carries an opaque token; everything else lives in the
//! `sessions` table. Extractors resolve the token once per request and cache
//! the result in the request extensions.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, header, request::Parts},
};
use chrono::{DateTime, Utc};
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};

use crate::error::AppError;
use crate::models::session::SESSION_TTL;
use crate::models::{CurrentUser, SessionToken};
use crate::services::auth::SessionStore;
use crate::state::AppState;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "redline_session";

/// Read the session token from the request cookies, if any.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .and_then(|cookie| SessionToken::from_cookie(cookie.value()))
}

/// `Set-Cookie` value that stores `token` until `expires_at`.
#[must_use]
pub fn session_cookie(
    token: &SessionToken,
    expires_at: DateTime<Utc>,
    secure: bool,
) -> HeaderValue {
    let max_age = (expires_at - Utc::now())
        .num_seconds()
        .clamp(0, SESSION_TTL.num_seconds());
    build_cookie(token.as_str().to_string(), Duration::seconds(max_age), secure)
}

/// `Set-Cookie` value that removes the session cookie.
#[must_use]
pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    build_cookie(String::new(), Duration::ZERO, secure)
}

fn build_cookie(value: String, max_age: Duration, secure: bool) -> HeaderValue {
    let cookie = Cookie::build((SESSION_COOKIE_NAME, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(max_age)
        .build();

    // Token alphabet is URL-safe base64, so the header is always valid.
    HeaderValue::from_str(&cookie.to_string()).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Resolved caller, cached per request.
#[derive(Clone)]
struct ResolvedUser(Option<CurrentUser>);

async fn resolve_user(
    parts: &mut Parts,
    state: &AppState,
) -> Result<Option<CurrentUser>, AppError> {
    if let Some(ResolvedUser(user)) = parts.extensions.get::<ResolvedUser>() {
        return Ok(user.clone());
    }

    let user = match session_token(&parts.headers) {
        Some(token) => SessionStore::new(state.pool())
            .get(&token)
            .await?
            .map(|(_, user)| state.admin_gate().current_user(user)),
        None => None,
    };

    if let Some(user) = &user {
        tracing::Span::current().record("user_id", user.id.as_i32());
    }
    parts.extensions.insert(ResolvedUser(user.clone()));
    Ok(user)
}

/// Extractor that requires a valid session.
///
/// Rejects with 401 when the cookie is missing, unknown or expired.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_user(parts, state)
            .await?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Extractor that requires the site operator.
///
/// Rejects with 401 when unauthenticated and 403 when authenticated as anyone
/// other than the configured admin.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::warn!(user_id = %user.id, "non-admin attempted admin access");
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireUser`, this does not reject the request if nobody is logged in.
pub struct OptionalUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_user(parts, state).await.map(Self)
    }
}
