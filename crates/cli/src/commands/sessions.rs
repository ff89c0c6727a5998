//! Session maintenance.

use redline_site::db::RepositoryError;
use redline_site::services::auth::SessionStore;

use super::{CommandError, connect};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Delete expired sessions, returning how many were removed.
pub async fn purge() -> Result<u64, SessionError> {
    let pool = connect().await?;
    let removed = SessionStore::new(&pool).purge_expired().await?;
    tracing::info!(removed, "Expired sessions purged");
    Ok(removed)
}
