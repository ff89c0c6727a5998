//! CLI subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod sessions;

use secrecy::SecretString;
use sqlx::PgPool;

/// Errors shared by every command that talks to the database.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect using `DATABASE_URL` (a `.env` file is honored).
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(redline_site::db::create_pool(&database_url).await?)
}
