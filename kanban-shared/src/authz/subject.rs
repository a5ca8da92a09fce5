/// Subject resolution: which board owns a list or a card

use crate::error::StatusResult;
use crate::models::{card::Card, list::List};
use async_trait::async_trait;
use sqlx::PgPool;

#[async_trait]
pub trait SubjectResolver: Send + Sync + 'static {
    /// Owning board of a list, `None` if the list never existed
    async fn board_of_list(&self, list_id: i64) -> StatusResult<Option<i64>>;

    /// Owning board of a card, `None` if the card never existed
    async fn board_of_card(&self, card_id: i64) -> StatusResult<Option<i64>>;
}

/// Resolver reading the lists and cards tables
///
/// Soft-deleted rows still resolve, so a retried delete reaches its handler.
#[derive(Clone)]
pub struct PgSubjectResolver {
    pool: PgPool,
}

impl PgSubjectResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubjectResolver for PgSubjectResolver {
    async fn board_of_list(&self, list_id: i64) -> StatusResult<Option<i64>> {
        Ok(List::board_of(&self.pool, list_id).await?)
    }

    async fn board_of_card(&self, card_id: i64) -> StatusResult<Option<i64>> {
        Ok(Card::board_of(&self.pool, card_id).await?)
    }
}

/// Resolver for services whose methods never name a list or card
pub struct NoSubjects;

#[async_trait]
impl SubjectResolver for NoSubjects {
    async fn board_of_list(&self, _list_id: i64) -> StatusResult<Option<i64>> {
        Ok(None)
    }

    async fn board_of_card(&self, _card_id: i64) -> StatusResult<Option<i64>> {
        Ok(None)
    }
}
