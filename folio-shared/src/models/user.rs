/// User model and database operations
///
/// Users are never registered through Folio itself. A local record is
/// provisioned the first time a valid identity-provider session is seen, keyed
/// by the provider's subject id, and is never mutated or deleted afterwards.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id TEXT PRIMARY KEY,
///     email TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT users_email_key UNIQUE (email)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use folio_shared::models::user::{User, NewUser};
/// use folio_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(
///     &pool,
///     NewUser {
///         id: "8f2c0d9e-5a1b-4c3d-9e8f-7a6b5c4d3e2f".to_string(),
///         email: "editor@example.com".to_string(),
///     },
/// )
/// .await?;
///
/// let found = User::find_by_email(&pool, "editor@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Unique constraint backing email uniqueness
pub const EMAIL_CONSTRAINT: &str = "users_email_key";

/// Primary key constraint of the users table
pub const PRIMARY_KEY_CONSTRAINT: &str = "users_pkey";

/// A local user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Identity provider subject id
    pub id: String,

    /// Email address claimed by the identity provider
    ///
    /// Unique across all users
    pub email: String,

    /// When the record was provisioned
    pub created_at: DateTime<Utc>,
}

/// Input for provisioning a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    /// Identity provider subject id, used verbatim as the local id
    pub id: String,

    /// Email address
    pub email: String,
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The email or id already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: NewUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email)
            VALUES ($1, $2)
            RETURNING id, email, created_at
            "#,
        )
        .bind(data.id)
        .bind(data.email)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by id
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by exact email address
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Counts provisioned users
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
