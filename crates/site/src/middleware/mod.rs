//! HTTP middleware stack for the site.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Error detail exposure (non-production only)
//! 5. Security headers (CSP, frame denial, etc.)
//! 6. Rate limiting (per route group, see [`rate_limit`])
//!
//! Authentication is not a layer: handlers take [`RequireUser`],
//! [`RequireAdmin`] or [`OptionalUser`] extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{
    OptionalUser, RequireAdmin, RequireUser, clear_session_cookie, session_cookie, session_token,
};
pub use rate_limit::{
    auth_rate_limit, client_key, comment_rate_limit, contact_rate_limit, read_rate_limit,
    write_rate_limit,
};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
