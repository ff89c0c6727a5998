//! Redline Core - shared domain types.
//!
//! Used by every Redline component:
//! - `site` - Public marketing site, blog and admin JSON API
//! - `cli` - Command-line tools for migrations and operator tasks
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, slugs and moderation statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
