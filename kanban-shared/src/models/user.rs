/// User model and database operations
///
/// Users are owned by the identity service. Usernames and emails are unique
/// case-insensitively, and an email is considered taken while it sits in
/// another user's pending `new_email` slot as well.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     username VARCHAR(64) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     new_email VARCHAR(255),
///     full_name VARCHAR(255) NOT NULL DEFAULT '',
///     password_hash VARCHAR(255) NOT NULL,
///     email_token VARCHAR(64),
///     email_token_issued_at TIMESTAMPTZ,
///     email_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use kanban_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     username: "alice".to_string(),
///     email: "a@x".to_string(),
///     full_name: "A".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// let found = User::find_by_username(&pool, "ALICE").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

/// A user account
///
/// Secrets are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,

    pub username: String,

    pub email: String,

    /// Email waiting for confirmation
    pub new_email: Option<String>,

    pub full_name: String,

    /// Argon2id hash
    #[serde(skip)]
    pub password_hash: String,

    /// Hex token sent to `new_email`
    #[serde(skip)]
    pub email_token: Option<String>,

    #[serde(skip)]
    pub email_token_issued_at: Option<DateTime<Utc>>,

    pub email_confirmed: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    /// Argon2id hash, never the plaintext password
    pub password_hash: String,
}

impl User {
    /// Inserts a user
    ///
    /// # Errors
    ///
    /// A duplicate username or email surfaces as a unique violation.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, full_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, new_email, full_name, password_hash,
                      email_token, email_token_issued_at, email_confirmed,
                      created_at, updated_at
            "#,
        )
        .bind(data.username)
        .bind(data.email)
        .bind(data.full_name)
        .bind(data.password_hash)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, new_email, full_name, password_hash,
                   email_token, email_token_issued_at, email_confirmed,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Case-insensitive lookup by username
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, new_email, full_name, password_hash,
                   email_token, email_token_issued_at, email_confirmed,
                   created_at, updated_at
            FROM users
            WHERE LOWER(username) = LOWER($1)
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await
    }

    /// Locks the user row for an email change
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, new_email, full_name, password_hash,
                   email_token, email_token_issued_at, email_confirmed,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// True if `email` is anyone's current or pending email
    ///
    /// `except` excludes one user, so re-requesting one's own pending address
    /// is not reported as taken.
    pub async fn email_in_use(
        conn: &mut PgConnection,
        email: &str,
        except: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE (LOWER(email) = LOWER($1) OR LOWER(new_email) = LOWER($1))
                  AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(except)
        .fetch_one(conn)
        .await
    }

    /// Stores a pending email with a fresh confirmation token
    pub async fn set_pending_email(
        conn: &mut PgConnection,
        id: i64,
        new_email: &str,
        token: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET new_email = $2,
                email_token = $3,
                email_token_issued_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, email, new_email, full_name, password_hash,
                      email_token, email_token_issued_at, email_confirmed,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(new_email)
        .bind(token)
        .fetch_one(conn)
        .await
    }

    /// Promotes the pending email and clears the token
    pub async fn confirm_new_email(
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = new_email,
                new_email = NULL,
                email_token = NULL,
                email_token_issued_at = NULL,
                email_confirmed = TRUE,
                updated_at = NOW()
            WHERE id = $1 AND new_email IS NOT NULL
            RETURNING id, username, email, new_email, full_name, password_hash,
                      email_token, email_token_issued_at, email_confirmed,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_one(conn)
        .await
    }

    /// Returns the subset of `ids` that exist
    pub async fn existing_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}
