//! Database operations for the site `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Administrative accounts (created once via setup)
//! - `sessions` - Login sessions keyed by token digest
//! - `posts` / `post_images` - Blog articles and their embedded image URLs
//! - `comments` - Visitor comments with moderation status
//! - `contact_messages` - Contact form inquiries
//! - `subscribers` - Newsletter sign-ups
//!
//! # Migrations
//!
//! Migrations are stored in `crates/site/migrations/` and run via:
//! ```bash
//! cargo run -p redline-cli -- migrate
//! ```

pub mod comments;
pub mod messages;
pub mod posts;
pub mod sessions;
pub mod subscribers;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use comments::CommentRepository;
pub use messages::MessageRepository;
pub use posts::PostRepository;
pub use sessions::SessionRepository;
pub use subscribers::SubscriberRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
///
/// Built from `sqlx::Error` through [`From`], which sorts the handful of
/// persistence failures callers can act on into their own variants.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The database could not be reached (pool timeout, I/O, TLS).
    #[error("database unavailable: {0}")]
    Unavailable(sqlx::Error),

    /// Any other database error.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Foreign key violation, i.e. a reference to a missing parent row.
    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => Self::Unavailable(err),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Self::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                Self::InvalidReference(db.constraint().unwrap_or("foreign key").to_string())
            }
            other => Self::Database(other),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
