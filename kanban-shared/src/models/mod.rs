/// Database models for the kanban backend
///
/// Each model owns its SQL. Reads used standalone take `&PgPool`; statements
/// that must run inside a caller's transaction take `&mut PgConnection`.
///
/// # Models
///
/// - `user`: accounts, pending email changes
/// - `refresh_token`: hashed refresh tokens
/// - `board`: boards and visibility
/// - `board_member`: the `(board, user) -> role` mapping
/// - `list`: positioned lists within a board
/// - `card`: positioned cards within a list
/// - `label`: board labels and card links
/// - `attachment`: card attachment metadata
/// - `comment`: card comments
///
/// # Example
///
/// ```no_run
/// use kanban_shared::models::board::{Board, Visibility};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let mut tx = pool.begin().await?;
/// let board = Board::create(&mut *tx, "B1", Visibility::Private).await?;
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

pub mod attachment;
pub mod board;
pub mod board_member;
pub mod card;
pub mod comment;
pub mod label;
pub mod list;
pub mod refresh_token;
pub mod user;
