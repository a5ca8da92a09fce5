/// `board.*` consumer: deleting a board deletes its lists

use crate::support::event_id;
use async_trait::async_trait;
use kanban_shared::error::Status;
use kanban_shared::events::{routing, Dispatch, EventHandler};
use kanban_shared::models::list::List;
use sqlx::PgPool;

pub struct ListEvents {
    pool: PgPool,
}

impl ListEvents {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventHandler for ListEvents {
    fn bindings(&self) -> &'static [&'static str] {
        &[routing::BOARD_ALL]
    }

    async fn handle(&self, routing_key: &str, payload: &[u8]) -> Result<Dispatch, Status> {
        match routing_key {
            routing::BOARD_DELETE => {
                let board_id = event_id(payload)?;
                let lists = List::soft_delete_by_board(&self.pool, board_id).await?;
                tracing::info!(board_id, lists, "Board cascade applied to lists");
                Ok(Dispatch::Handled)
            }
            _ => Ok(Dispatch::Unhandled),
        }
    }
}
