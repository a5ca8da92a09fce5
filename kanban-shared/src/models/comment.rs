/// Card comments
///
/// The author is captured from the request context at creation and never
/// changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub card_id: i64,
    pub author_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub async fn create(
        pool: &PgPool,
        card_id: i64,
        author_id: i64,
        content: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (card_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, card_id, author_id, content, created_at
            "#,
        )
        .bind(card_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, card_id, author_id, content, created_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_for_card(pool: &PgPool, card_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, card_id, author_id, content, created_at
            FROM comments
            WHERE card_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_for_cards(conn: &mut PgConnection, card_ids: &[i64]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE card_id = ANY($1)")
            .bind(card_ids)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
