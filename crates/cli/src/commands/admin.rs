//! Account setup from the command line.
//!
//! Same rules as `POST /api/auth/setup`: only the first account can be
//! created this way, its email must match `ADMIN_EMAIL`, and the password
//! must be at least 8 characters.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `ADMIN_EMAIL` - Operator email; defaults to the email being created

use std::io::BufRead;

use redline_core::Email;
use redline_site::services::auth::{AuthError, AuthService};

use super::{CommandError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Could not read password: {0}")]
    Input(#[from] std::io::Error),
}

/// Read the password from the first line of stdin.
pub fn read_password() -> Result<String, AdminError> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

/// Create the first account.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<i32, AdminError> {
    let pool = connect().await?;

    let admin_email = match std::env::var("ADMIN_EMAIL") {
        Ok(configured) => Email::parse(&configured),
        Err(_) => Email::parse(email),
    }
    .map_err(|e| AdminError::InvalidEmail(e.to_string()))?;

    tracing::info!("Creating account: {}", email);
    let user = AuthService::new(&pool)
        .setup(email, password, name, &admin_email)
        .await?;

    tracing::info!(user_id = %user.id, "Account created");
    Ok(user.id.as_i32())
}
