/// Board model and database operations
///
/// Boards are soft-deleted: `deleted_at` is set once and every live query
/// filters on `deleted_at IS NULL`. Lookups that must see deleted rows (so a
/// retried delete can be answered idempotently) use [`Board::find_any`].
///
/// # Schema
///
/// ```sql
/// CREATE TYPE board_visibility AS ENUM ('private', 'public', 'team');
///
/// CREATE TABLE boards (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     visibility board_visibility NOT NULL DEFAULT 'private',
///     archived BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

/// Who can see a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "board_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Members only
    #[default]
    Private,

    /// Anyone authenticated
    Public,

    /// Reserved; currently treated like `Private`
    Team,
}

impl Visibility {
    /// True if non-members may read the board
    pub fn is_open(&self) -> bool {
        matches!(self, Visibility::Public)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: i64,
    pub name: String,
    pub visibility: Visibility,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Board {
    pub async fn create(
        conn: &mut PgConnection,
        name: &str,
        visibility: Visibility,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"
            INSERT INTO boards (name, visibility)
            VALUES ($1, $2)
            RETURNING id, name, visibility, archived, created_at, updated_at, deleted_at
            "#,
        )
        .bind(name)
        .bind(visibility)
        .fetch_one(conn)
        .await
    }

    /// Live board by id
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"
            SELECT id, name, visibility, archived, created_at, updated_at, deleted_at
            FROM boards
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Board by id including soft-deleted rows, locked for update
    pub async fn find_any(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"
            SELECT id, name, visibility, archived, created_at, updated_at, deleted_at
            FROM boards
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Boards the user is a member of, newest first
    pub async fn list_for_member(
        pool: &PgPool,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"
            SELECT b.id, b.name, b.visibility, b.archived, b.created_at, b.updated_at, b.deleted_at
            FROM boards b
            JOIN board_members m ON m.board_id = b.id
            WHERE m.user_id = $1 AND b.deleted_at IS NULL
            ORDER BY b.created_at DESC, b.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_member(pool: &PgPool, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM boards b
            JOIN board_members m ON m.board_id = b.id
            WHERE m.user_id = $1 AND b.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn rename(pool: &PgPool, id: i64, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"
            UPDATE boards SET name = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, visibility, archived, created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_visibility(
        pool: &PgPool,
        id: i64,
        visibility: Visibility,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"
            UPDATE boards SET visibility = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, visibility, archived, created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(visibility)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_archived(
        pool: &PgPool,
        id: i64,
        archived: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"
            UPDATE boards SET archived = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, visibility, archived, created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(archived)
        .fetch_optional(pool)
        .await
    }

    /// Marks the board deleted; a no-op on an already deleted board
    pub async fn soft_delete(conn: &mut PgConnection, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE boards SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_default_is_private() {
        assert_eq!(Visibility::default(), Visibility::Private);
    }

    #[test]
    fn test_team_is_not_open() {
        assert!(Visibility::Public.is_open());
        assert!(!Visibility::Private.is_open());
        assert!(!Visibility::Team.is_open());
    }

    #[test]
    fn test_visibility_wire_names() {
        assert_eq!(serde_json::to_string(&Visibility::Team).unwrap(), "\"team\"");
        let parsed: Visibility = serde_json::from_str("\"public\"").unwrap();
        assert_eq!(parsed, Visibility::Public);
    }
}
