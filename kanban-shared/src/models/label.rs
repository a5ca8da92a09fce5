/// Board labels and their attachment to cards
///
/// Labels belong to a board and attach to that board's cards through the
/// `card_labels` join table. Deleting a label detaches it from every card in
/// the same transaction before removing it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: i64,
    pub board_id: i64,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl Label {
    pub async fn create(
        pool: &PgPool,
        board_id: i64,
        name: &str,
        color: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            r#"
            INSERT INTO labels (board_id, name, color)
            VALUES ($1, $2, $3)
            RETURNING id, board_id, name, color, created_at
            "#,
        )
        .bind(board_id)
        .bind(name)
        .bind(color)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            "SELECT id, board_id, name, color, created_at FROM labels WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_by_board(pool: &PgPool, board_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            "SELECT id, board_id, name, color, created_at FROM labels WHERE board_id = $1 ORDER BY id",
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_for_card(pool: &PgPool, card_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            r#"
            SELECT l.id, l.board_id, l.name, l.color, l.created_at
            FROM labels l
            JOIN card_labels cl ON cl.label_id = l.id
            WHERE cl.card_id = $1
            ORDER BY l.id
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await
    }

    /// Detaches the label from all cards, then deletes it
    ///
    /// Returns false if no label with that id exists on the board.
    pub async fn delete(pool: &PgPool, board_id: i64, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM card_labels WHERE label_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM labels WHERE id = $1 AND board_id = $2")
            .bind(id)
            .bind(board_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Idempotent attach
    pub async fn attach(pool: &PgPool, card_id: i64, label_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO card_labels (card_id, label_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(card_id)
        .bind(label_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn detach(pool: &PgPool, card_id: i64, label_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM card_labels WHERE card_id = $1 AND label_id = $2")
            .bind(card_id)
            .bind(label_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Removes every label link of the given cards (card purge)
    pub async fn detach_all(conn: &mut PgConnection, card_ids: &[i64]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM card_labels WHERE card_id = ANY($1)")
            .bind(card_ids)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
