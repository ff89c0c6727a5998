//! Authentication route handlers.
//!
//! Email/password login backed by server-side sessions, plus the one-time
//! setup endpoint that creates the first account.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalUser, clear_session_cookie, session_cookie, session_token};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthError, AuthService, SessionStore};
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Setup request body.
#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Current session as reported to the client.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<CurrentUser>,
}

#[derive(Debug, Serialize)]
struct LogoutResponse {
    success: bool,
}

/// Routes that take credentials; mounted behind the auth rate limit.
pub fn credential_router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/setup", post(setup))
}

/// Session inspection and logout.
pub fn session_router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(session))
}

/// Log in with email and password.
///
/// POST /api/auth/login
///
/// Sets the session cookie on success. Every failure that involves the
/// account itself answers the same 401.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(req) = body?;

    let user = AuthService::new(state.pool())
        .login(&req.email, &req.password)
        .await?;

    start_session(&state, user).await
}

/// Create the first account.
///
/// POST /api/auth/setup
///
/// Only succeeds while no account exists. Once closed, every call is refused
/// with 403 before the body is even looked at.
#[instrument(skip_all)]
pub async fn setup(
    State(state): State<AppState>,
    body: std::result::Result<Json<SetupRequest>, JsonRejection>,
) -> Result<Response> {
    let auth = AuthService::new(state.pool());
    if !auth.is_setup_open().await? {
        tracing::warn!("setup attempted after completion");
        return Err(AuthError::SetupClosed.into());
    }

    let Json(req) = body?;
    let user = auth
        .setup(&req.email, &req.password, &req.name, &state.config().admin_email)
        .await?;

    start_session(&state, user).await
}

/// Revoke the current session.
///
/// POST /api/auth/logout
///
/// Always clears the cookie, even when the session was already gone.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    if let Some(token) = session_token(&headers) {
        SessionStore::new(state.pool()).revoke(&token).await?;
    }
    clear_sentry_user();

    Ok((
        [(
            header::SET_COOKIE,
            clear_session_cookie(state.config().secure_cookies()),
        )],
        Json(LogoutResponse { success: true }),
    ))
}

/// Report who is logged in.
///
/// GET /api/auth/session
pub async fn session(OptionalUser(user): OptionalUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: user.is_some(),
        user,
    })
}

async fn start_session(state: &AppState, user: User) -> Result<Response> {
    let (token, expires_at) = SessionStore::new(state.pool())
        .create(user.id)
        .await
        .map_err(AppError::from)?;

    let current = state.admin_gate().current_user(user);
    set_sentry_user(&current.id, Some(current.email.as_str()));
    tracing::info!(user_id = %current.id, is_admin = current.is_admin, "login successful");

    Ok((
        [(
            header::SET_COOKIE,
            session_cookie(&token, expires_at, state.config().secure_cookies()),
        )],
        Json(SessionResponse {
            authenticated: true,
            user: Some(current),
        }),
    )
        .into_response())
}
