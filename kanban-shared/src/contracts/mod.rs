/// Service contracts: method names, request/response messages, typed clients
///
/// Messages are JSON with camelCase field names. Request messages carry
/// `validator` rules, registered with each service's shape validator.
///
/// # Example
///
/// ```no_run
/// use kanban_shared::contracts::board::{BoardClient, CreateBoardRequest};
/// use kanban_shared::models::board::Visibility;
/// use kanban_shared::rpc::{Metadata, RpcClient};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), kanban_shared::error::Status> {
/// let boards = BoardClient::new(RpcClient::new("board:50052", Duration::from_secs(5))?);
/// let board = boards
///     .create_board(
///         &Metadata::new().with_user(1),
///         &CreateBoardRequest { name: "B1".to_string(), visibility: Visibility::Private },
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```

pub mod board;
pub mod card;
pub mod common;
pub mod identity;
pub mod list;
