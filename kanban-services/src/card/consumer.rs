/// Card cascades
///
/// `board.delete` and `list.delete` soft-delete the cards beneath them.
/// Every branch drops the label links, attachments and comments of the
/// deleted cards in the same transaction, and is safe to replay.

use crate::support::event_id;
use async_trait::async_trait;
use kanban_shared::error::Status;
use kanban_shared::events::{routing, Dispatch, EventHandler};
use kanban_shared::models::attachment::Attachment;
use kanban_shared::models::card::Card;
use kanban_shared::models::comment::Comment;
use kanban_shared::models::label::Label;
use sqlx::{PgConnection, PgPool};

pub struct CardEvents {
    pool: PgPool,
}

impl CardEvents {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn purge_card(&self, card_id: i64) -> Result<(), Status> {
        let mut tx = self.pool.begin().await?;
        purge(&mut *tx, &[card_id]).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn cascade_list(&self, list_id: i64) -> Result<(), Status> {
        let mut tx = self.pool.begin().await?;
        let cards = Card::soft_delete_by_list(&mut *tx, list_id).await?;
        purge(&mut *tx, &cards).await?;
        tx.commit().await?;

        tracing::info!(list_id, cards = cards.len(), "List cascade applied to cards");
        Ok(())
    }

    async fn cascade_board(&self, board_id: i64) -> Result<(), Status> {
        let mut tx = self.pool.begin().await?;
        let cards = Card::soft_delete_by_board(&mut *tx, board_id).await?;
        purge(&mut *tx, &cards).await?;
        tx.commit().await?;

        tracing::info!(board_id, cards = cards.len(), "Board cascade applied to cards");
        Ok(())
    }
}

async fn purge(conn: &mut PgConnection, card_ids: &[i64]) -> Result<(), Status> {
    if card_ids.is_empty() {
        return Ok(());
    }
    let labels = Label::detach_all(&mut *conn, card_ids).await?;
    let attachments = Attachment::delete_for_cards(&mut *conn, card_ids).await?;
    let comments = Comment::delete_for_cards(&mut *conn, card_ids).await?;

    tracing::info!(cards = card_ids.len(), labels, attachments, comments, "Card contents purged");
    Ok(())
}

#[async_trait]
impl EventHandler for CardEvents {
    fn bindings(&self) -> &'static [&'static str] {
        &[routing::BOARD_ALL, routing::LIST_ALL, routing::CARD_ALL]
    }

    async fn handle(&self, routing_key: &str, payload: &[u8]) -> Result<Dispatch, Status> {
        match routing_key {
            routing::BOARD_DELETE => self.cascade_board(event_id(payload)?).await?,
            routing::LIST_DELETE => self.cascade_list(event_id(payload)?).await?,
            routing::CARD_DELETE => self.purge_card(event_id(payload)?).await?,
            _ => return Ok(Dispatch::Unhandled),
        }
        Ok(Dispatch::Handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::testing::lazy_pool;
    use kanban_shared::events::{dispatch, matches_pattern};

    #[tokio::test]
    async fn test_bindings_cover_every_cascade() {
        let events = CardEvents::new(lazy_pool());
        for key in [routing::BOARD_DELETE, routing::LIST_DELETE, routing::CARD_DELETE] {
            assert!(events.bindings().iter().any(|p| matches_pattern(p, key)), "{}", key);
        }
    }

    #[tokio::test]
    async fn test_unknown_keys_are_dropped() {
        let events = CardEvents::new(lazy_pool());
        assert_eq!(dispatch(&events, "card.update", br#"{"id": 1}"#).await, Dispatch::Unhandled);
        assert_eq!(dispatch(&events, "list.update", br#"{"id": 1}"#).await, Dispatch::Unhandled);
    }

    #[tokio::test]
    async fn test_malformed_payload_never_reaches_the_database() {
        let events = CardEvents::new(lazy_pool());
        let err = events.handle(routing::CARD_DELETE, b"{}").await.unwrap_err();
        assert_eq!(err.code, kanban_shared::error::Code::ValidationFailed);
    }
}
