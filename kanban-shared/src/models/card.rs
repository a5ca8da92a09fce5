/// Card model and database operations
///
/// A card belongs to one list and carries its board id denormalized so board
/// cascades and authorization do not need a join. Positions are dense among
/// the live, non-archived cards of a list.
///
/// Two table constraints back the date rules: a completed card has a due
/// date, and the start date never follows the due date.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE cards (
///     id BIGSERIAL PRIMARY KEY,
///     list_id BIGINT NOT NULL REFERENCES lists(id),
///     board_id BIGINT NOT NULL REFERENCES boards(id),
///     name VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     position INTEGER NOT NULL,
///     archived BOOLEAN NOT NULL DEFAULT FALSE,
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     start_date TIMESTAMPTZ,
///     due_date TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ,
///     CHECK (NOT completed OR due_date IS NOT NULL),
///     CHECK (start_date IS NULL OR due_date IS NULL OR start_date <= due_date)
/// );
/// ```

use crate::ordering::Slot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: i64,
    pub list_id: i64,
    pub board_id: i64,
    pub name: String,
    pub description: String,
    pub position: i32,
    pub archived: bool,
    pub completed: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Editable card fields, already merged and checked by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct CardDetails {
    pub name: String,
    pub description: String,
    pub completed: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

impl CardDetails {
    /// Problems with the date rules, as `(field, message)` pairs
    pub fn date_violations(&self) -> Vec<(&'static str, &'static str)> {
        let mut out = Vec::new();
        if self.completed && self.due_date.is_none() {
            out.push(("dueDate", "a completed card needs a due date"));
        }
        if let (Some(start), Some(due)) = (self.start_date, self.due_date) {
            if start > due {
                out.push(("startDate", "start date must not be after due date"));
            }
        }
        out
    }
}

/// A card's parent list as seen under its row lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct ParentList {
    pub id: i64,
    pub board_id: i64,
    pub archived: bool,
}

impl Card {
    /// Live card by id
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Card>(
            r#"
            SELECT id, list_id, board_id, name, description, position, archived, completed,
                   start_date, due_date, created_at, updated_at, deleted_at
            FROM cards
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Card by id including deleted rows, locked for update
    pub async fn find_any(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Card>(
            r#"
            SELECT id, list_id, board_id, name, description, position, archived, completed,
                   start_date, due_date, created_at, updated_at, deleted_at
            FROM cards
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// `(list_id, board_id)` without locking, deleted cards included
    pub async fn placement(pool: &PgPool, id: i64) -> Result<Option<(i64, i64)>, sqlx::Error> {
        sqlx::query_as("SELECT list_id, board_id FROM cards WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Owning board, deleted cards included
    pub async fn board_of(pool: &PgPool, id: i64) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT board_id FROM cards WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_list(
        pool: &PgPool,
        list_id: i64,
        include_archived: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Card>(
            r#"
            SELECT id, list_id, board_id, name, description, position, archived, completed,
                   start_date, due_date, created_at, updated_at, deleted_at
            FROM cards
            WHERE list_id = $1 AND deleted_at IS NULL AND ($2 OR NOT archived)
            ORDER BY archived, position, id
            "#,
        )
        .bind(list_id)
        .bind(include_archived)
        .fetch_all(pool)
        .await
    }

    /// Locks live parent lists in id order; lists not found are omitted
    pub async fn lock_lists(
        conn: &mut PgConnection,
        list_ids: &[i64],
    ) -> Result<Vec<ParentList>, sqlx::Error> {
        sqlx::query_as::<_, ParentList>(
            r#"
            SELECT id, board_id, archived FROM lists
            WHERE id = ANY($1) AND deleted_at IS NULL
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(list_ids)
        .fetch_all(conn)
        .await
    }

    /// Locks the active cards of one or more lists, ordered by (list, position)
    pub async fn lock_siblings(
        conn: &mut PgConnection,
        list_ids: &[i64],
    ) -> Result<Vec<Slot>, sqlx::Error> {
        sqlx::query_as::<_, Slot>(
            r#"
            SELECT id, list_id AS parent_id, position
            FROM cards
            WHERE list_id = ANY($1) AND NOT archived AND deleted_at IS NULL
            ORDER BY list_id, position
            FOR UPDATE
            "#,
        )
        .bind(list_ids)
        .fetch_all(conn)
        .await
    }

    pub async fn insert(
        conn: &mut PgConnection,
        list_id: i64,
        board_id: i64,
        position: i32,
        details: &CardDetails,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Card>(
            r#"
            INSERT INTO cards (list_id, board_id, position, name, description, completed, start_date, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, list_id, board_id, name, description, position, archived, completed,
                      start_date, due_date, created_at, updated_at, deleted_at
            "#,
        )
        .bind(list_id)
        .bind(board_id)
        .bind(position)
        .bind(&details.name)
        .bind(&details.description)
        .bind(details.completed)
        .bind(details.start_date)
        .bind(details.due_date)
        .fetch_one(conn)
        .await
    }

    pub async fn write_details(
        conn: &mut PgConnection,
        id: i64,
        details: &CardDetails,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Card>(
            r#"
            UPDATE cards
            SET name = $2, description = $3, completed = $4, start_date = $5, due_date = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, list_id, board_id, name, description, position, archived, completed,
                      start_date, due_date, created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(&details.name)
        .bind(&details.description)
        .bind(details.completed)
        .bind(details.start_date)
        .bind(details.due_date)
        .fetch_one(conn)
        .await
    }

    pub async fn set_archived(
        conn: &mut PgConnection,
        id: i64,
        archived: bool,
        position: i32,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Card>(
            r#"
            UPDATE cards SET archived = $2, position = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, list_id, board_id, name, description, position, archived, completed,
                      start_date, due_date, created_at, updated_at, deleted_at
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
            "UPDATE cards SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Cascade for `list.delete`
    ///
    /// Returns every deleted card of the list, including ones deleted
    /// before, so a replay purges the same set.
    pub async fn soft_delete_by_list(conn: &mut PgConnection, list_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            WITH gone AS (
                UPDATE cards SET deleted_at = NOW(), updated_at = NOW()
                WHERE list_id = $1 AND deleted_at IS NULL
                RETURNING id
            )
            SELECT id FROM gone
            UNION
            SELECT id FROM cards WHERE list_id = $1 AND deleted_at IS NOT NULL
            "#,
        )
        .bind(list_id)
        .fetch_all(conn)
        .await
    }

    /// Cascade for `board.delete`; same contract as [`Card::soft_delete_by_list`]
    pub async fn soft_delete_by_board(conn: &mut PgConnection, board_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            WITH gone AS (
                UPDATE cards SET deleted_at = NOW(), updated_at = NOW()
                WHERE board_id = $1 AND deleted_at IS NULL
                RETURNING id
            )
            SELECT id FROM gone
            UNION
            SELECT id FROM cards WHERE board_id = $1 AND deleted_at IS NOT NULL
            "#,
        )
        .bind(board_id)
        .fetch_all(conn)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn details() -> CardDetails {
        CardDetails {
            name: "c".to_string(),
            description: String::new(),
            completed: false,
            start_date: None,
            due_date: None,
        }
    }

    #[test]
    fn test_completed_requires_due_date() {
        let mut d = details();
        d.completed = true;
        assert_eq!(d.date_violations(), vec![("dueDate", "a completed card needs a due date")]);

        d.due_date = Some(Utc::now());
        assert!(d.date_violations().is_empty());
    }

    #[test]
    fn test_start_after_due_is_rejected() {
        let now = Utc::now();
        let mut d = details();
        d.start_date = Some(now);
        d.due_date = Some(now - Duration::days(1));
        assert_eq!(d.date_violations().len(), 1);

        d.due_date = Some(now);
        assert!(d.date_violations().is_empty());
    }
}
