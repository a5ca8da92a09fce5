/// List model and database operations
///
/// Lists carry a dense `position` among the live, non-archived lists of their
/// board. Positions are only written through the ordering helpers in
/// [`crate::ordering`]; this module provides the locked reads they need.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE lists (
///     id BIGSERIAL PRIMARY KEY,
///     board_id BIGINT NOT NULL REFERENCES boards(id),
///     name VARCHAR(255) NOT NULL,
///     position INTEGER NOT NULL,
///     archived BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
///
/// CREATE UNIQUE INDEX lists_board_position_key ON lists (board_id, position)
///     WHERE NOT archived AND deleted_at IS NULL;
/// ```

use crate::ordering::Slot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: i64,
    pub board_id: i64,
    pub name: String,
    pub position: i32,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl List {
    /// Live list by id
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            SELECT id, board_id, name, position, archived, created_at, updated_at, deleted_at
            FROM lists
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// List by id including deleted rows, locked for update
    pub async fn find_any(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            SELECT id, board_id, name, position, archived, created_at, updated_at, deleted_at
            FROM lists
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Owning board, deleted lists included
    pub async fn board_of(pool: &PgPool, id: i64) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT board_id FROM lists WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Live lists of a board: active ones by position, then archived ones
    pub async fn list_by_board(
        pool: &PgPool,
        board_id: i64,
        include_archived: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            SELECT id, board_id, name, position, archived, created_at, updated_at, deleted_at
            FROM lists
            WHERE board_id = $1 AND deleted_at IS NULL AND ($2 OR NOT archived)
            ORDER BY archived, position, id
            "#,
        )
        .bind(board_id)
        .bind(include_archived)
        .fetch_all(pool)
        .await
    }

    /// Locks the active siblings of a board in position order
    ///
    /// Callers lock the board row first so concurrent creates and moves
    /// serialize on it.
    pub async fn lock_siblings(
        conn: &mut PgConnection,
        board_id: i64,
    ) -> Result<Vec<Slot>, sqlx::Error> {
        sqlx::query_as::<_, Slot>(
            r#"
            SELECT id, board_id AS parent_id, position
            FROM lists
            WHERE board_id = $1 AND NOT archived AND deleted_at IS NULL
            ORDER BY position
            FOR UPDATE
            "#,
        )
        .bind(board_id)
        .fetch_all(conn)
        .await
    }

    /// Row lock on the live parent board; `None` if the board is gone
    pub async fn lock_board(conn: &mut PgConnection, board_id: i64) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM boards WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
            .bind(board_id)
            .fetch_optional(conn)
            .await
    }

    /// Inserts at `position`; callers compute it under the board lock
    pub async fn insert(
        conn: &mut PgConnection,
        board_id: i64,
        name: &str,
        position: i32,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            INSERT INTO lists (board_id, name, position)
            VALUES ($1, $2, $3)
            RETURNING id, board_id, name, position, archived, created_at, updated_at, deleted_at
            "#,
        )
        .bind(board_id)
        .bind(name)
        .bind(position)
        .fetch_one(conn)
        .await
    }

    pub async fn rename(pool: &PgPool, id: i64, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            UPDATE lists SET name = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, board_id, name, position, archived, created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Flips the archived flag and sets the position in one statement
    pub async fn set_archived(
        conn: &mut PgConnection,
        id: i64,
        archived: bool,
        position: i32,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            UPDATE lists SET archived = $2, position = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, board_id, name, position, archived, created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(archived)
        .bind(position)
        .fetch_one(conn)
        .await
    }

    pub async fn soft_delete(conn: &mut PgConnection, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE lists SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Cascade for `board.delete`; replays affect nothing
    pub async fn soft_delete_by_board(pool: &PgPool, board_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE lists SET deleted_at = NOW(), updated_at = NOW() WHERE board_id = $1 AND deleted_at IS NULL",
        )
        .bind(board_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
