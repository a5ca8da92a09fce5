/// Card attachment metadata
///
/// Only metadata is stored; blobs live in external storage referenced by
/// `storage_key`. A card holds at most [`MAX_ATTACHMENTS_PER_CARD`]
/// attachments, counted under the card's row lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

pub const MAX_ATTACHMENTS_PER_CARD: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: i64,
    pub card_id: i64,
    pub board_id: i64,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub uploaded_by: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for a new attachment; `board_id` is copied from the card
#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub card_id: i64,
    pub board_id: i64,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub uploaded_by: i64,
}

impl Attachment {
    pub async fn create(
        conn: &mut PgConnection,
        data: CreateAttachment,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments (card_id, board_id, file_name, content_type, size_bytes, storage_key, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, card_id, board_id, file_name, content_type, size_bytes, storage_key,
                      uploaded_by, created_at
            "#,
        )
        .bind(data.card_id)
        .bind(data.board_id)
        .bind(data.file_name)
        .bind(data.content_type)
        .bind(data.size_bytes)
        .bind(data.storage_key)
        .bind(data.uploaded_by)
        .fetch_one(conn)
        .await
    }

    pub async fn count_for_card(conn: &mut PgConnection, card_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM attachments WHERE card_id = $1")
            .bind(card_id)
            .fetch_one(conn)
            .await
    }

    pub async fn list_for_card(pool: &PgPool, card_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, card_id, board_id, file_name, content_type, size_bytes, storage_key,
                   uploaded_by, created_at
            FROM attachments
            WHERE card_id = $1
            ORDER BY id
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, card_id: i64, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = $1 AND card_id = $2")
            .bind(id)
            .bind(card_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_for_cards(conn: &mut PgConnection, card_ids: &[i64]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM attachments WHERE card_id = ANY($1)")
            .bind(card_ids)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
