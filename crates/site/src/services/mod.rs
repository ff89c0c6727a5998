//! Business logic services for the site.
//!
//! # Services
//!
//! - `rate_limit` - Sliding-window request limiter (memory or Redis)
//! - `spam` - Rule-based comment spam scoring
//! - `sanitize` - HTML stripping for stored visitor text
//! - `auth` - Password login, sessions, first-account setup
//! - `authz` - Single-operator admin gate
//! - `moderation` - Comment submission and moderation workflow
//! - `cache` - Rendered page cache for the public blog
//! - `images` - Cloudinary upload client

pub mod auth;
pub mod authz;
pub mod cache;
pub mod images;
pub mod moderation;
pub mod rate_limit;
pub mod sanitize;
pub mod spam;
