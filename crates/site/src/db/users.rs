//! User repository for database operations.

use chrono::{DateTime, Utc};
use redline_core::{Email, PasswordScheme, UserId, UserRole};
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;
use crate::models::{StoredPassword, User};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    name: String,
    role: UserRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            name: row.name,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserWithPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
    password_scheme: PasswordScheme,
}

const USER_COLUMNS: &str = "id, email, name, role, created_at, updated_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Count all users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user and their stored password by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, StoredPassword)>, RepositoryError> {
        let row: Option<UserWithPasswordRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash, password_scheme
             FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| {
            let password = StoredPassword {
                hash: r.password_hash,
                scheme: r.password_scheme,
            };
            User::try_from(r.user).map(|user| (user, password))
        })
        .transpose()
    }

    /// Replace a user's password hash, e.g. after an opportunistic rehash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_password(
        &self,
        id: UserId,
        password: &StoredPassword,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, password_scheme = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&password.hash)
        .bind(password.scheme)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Serialize first-user creation across concurrent setup attempts.
///
/// Takes a transaction-scoped advisory lock, so it must run inside the
/// transaction that performs the count and insert.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_for_setup(conn: &mut PgConnection) -> Result<(), RepositoryError> {
    // Arbitrary constant shared by every setup path (HTTP and CLI).
    const SETUP_LOCK_KEY: i64 = 0x5265_646c_696e_6501;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SETUP_LOCK_KEY)
        .execute(conn)
        .await?;
    Ok(())
}

/// Count users on an existing connection (for use inside a transaction).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count_in(conn: &mut PgConnection) -> Result<i64, RepositoryError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// Insert a user on an existing connection (for use inside a transaction).
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the email is already taken.
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_in(
    conn: &mut PgConnection,
    email: &Email,
    name: &str,
    role: UserRole,
    password: &StoredPassword,
) -> Result<User, RepositoryError> {
    let row: UserRow = sqlx::query_as(&format!(
        "INSERT INTO users (email, name, role, password_hash, password_scheme)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(email.as_str())
    .bind(name)
    .bind(role)
    .bind(&password.hash)
    .bind(password.scheme)
    .fetch_one(conn)
    .await?;

    row.try_into()
}
