/// List service handlers
///
/// Every position change follows the locking recipe of
/// [`kanban_shared::ordering`]: board row, then the board's active lists,
/// then the computed layout is persisted.

use super::ListState;
use crate::support::{ensure_visible, publish};
use kanban_shared::contracts::common::{Empty, IdRequest};
use kanban_shared::contracts::list::{
    CreateListRequest, GetListsByBoardRequest, ListsResponse, MoveListRequest, UpdateListRequest,
};
use kanban_shared::error::{Status, StatusResult};
use kanban_shared::events::routing;
use kanban_shared::models::list::List;
use kanban_shared::ordering::{self, Siblings};
use kanban_shared::rpc::RequestContext;
use sqlx::PgConnection;

fn list_not_found() -> Status {
    Status::not_found("list not found")
}

/// Locks the board and the list; deleted lists count as missing
async fn lock_live(conn: &mut PgConnection, board_id: i64, list_id: i64) -> StatusResult<List> {
    List::lock_board(conn, board_id)
        .await?
        .ok_or_else(|| Status::not_found("board not found"))?;

    List::find_any(conn, list_id)
        .await?
        .filter(|list| list.deleted_at.is_none() && list.board_id == board_id)
        .ok_or_else(list_not_found)
}

pub async fn create_list(state: ListState, ctx: RequestContext, req: CreateListRequest) -> StatusResult<List> {
    let board_id = ctx.board()?;

    let mut tx = state.pool.begin().await?;
    List::lock_board(&mut *tx, board_id)
        .await?
        .ok_or_else(|| Status::not_found("board not found"))?;

    let siblings = List::lock_siblings(&mut *tx, board_id).await?;
    let position = ordering::next_position(&siblings);
    let list = List::insert(&mut *tx, board_id, &req.name, position).await?;
    tx.commit().await?;

    tracing::info!(list_id = list.id, board_id, position, "List created");
    Ok(list)
}

pub async fn get_list_by_id(state: ListState, ctx: RequestContext, req: IdRequest) -> StatusResult<List> {
    let list = List::find_by_id(&state.pool, req.id)
        .await?
        .ok_or_else(list_not_found)?;

    ensure_visible(state.oracle.as_ref(), &ctx, list.board_id).await?;
    Ok(list)
}

pub async fn get_lists_by_board(
    state: ListState,
    ctx: RequestContext,
    req: GetListsByBoardRequest,
) -> StatusResult<ListsResponse> {
    ensure_visible(state.oracle.as_ref(), &ctx, req.board_id).await?;

    let lists = List::list_by_board(&state.pool, req.board_id, req.include_archived).await?;
    Ok(ListsResponse { lists })
}

pub async fn update_list(state: ListState, _ctx: RequestContext, req: UpdateListRequest) -> StatusResult<List> {
    List::rename(&state.pool, req.id, &req.name)
        .await?
        .ok_or_else(list_not_found)
}

/// Moves a list to a new position within its board
///
/// Runs serializable; moving to the current position is a no-op.
pub async fn move_list(state: ListState, ctx: RequestContext, req: MoveListRequest) -> StatusResult<ListsResponse> {
    let board_id = ctx.board()?;

    let mut tx = state.pool.begin().await?;
    ordering::serializable(&mut *tx).await?;

    let list = lock_live(&mut *tx, board_id, req.id).await?;
    if list.archived {
        return Err(Status::precondition_failed("archived lists cannot be moved"));
    }

    let siblings = List::lock_siblings(&mut *tx, board_id).await?;
    let ids = ordering::ids_under(&siblings, board_id);
    let order = ordering::reorder(&ids, list.id, req.new_position).ok_or_else(list_not_found)?;

    let changes = ordering::changed(&siblings, &ordering::layout(board_id, &order));
    ordering::persist(&mut *tx, Siblings::Lists, &changes).await?;
    tx.commit().await?;

    tracing::info!(list_id = list.id, board_id, position = req.new_position, moved = changes.len(), "List moved");

    let lists = List::list_by_board(&state.pool, board_id, false).await?;
    Ok(ListsResponse { lists })
}

/// Archives the list and closes the gap it leaves
pub async fn archive_list(state: ListState, ctx: RequestContext, req: IdRequest) -> StatusResult<List> {
    let board_id = ctx.board()?;

    let mut tx = state.pool.begin().await?;
    let list = lock_live(&mut *tx, board_id, req.id).await?;
    if list.archived {
        return Ok(list);
    }

    let siblings = List::lock_siblings(&mut *tx, board_id).await?;
    let archived = List::set_archived(&mut *tx, list.id, true, list.position).await?;

    let remaining = ordering::without(&ordering::ids_under(&siblings, board_id), list.id);
    let changes = ordering::changed(&siblings, &ordering::layout(board_id, &remaining));
    ordering::persist(&mut *tx, Siblings::Lists, &changes).await?;
    tx.commit().await?;

    tracing::info!(list_id = list.id, board_id, "List archived");
    Ok(archived)
}

/// Restores an archived list at the end of the board
pub async fn restore_list(state: ListState, ctx: RequestContext, req: IdRequest) -> StatusResult<List> {
    let board_id = ctx.board()?;

    let mut tx = state.pool.begin().await?;
    let list = lock_live(&mut *tx, board_id, req.id).await?;
    if !list.archived {
        return Ok(list);
    }

    let siblings = List::lock_siblings(&mut *tx, board_id).await?;
    let position = ordering::next_position(&siblings);
    let restored = List::set_archived(&mut *tx, list.id, false, position).await?;
    tx.commit().await?;

    tracing::info!(list_id = list.id, board_id, position, "List restored");
    Ok(restored)
}

/// Soft-deletes the list, renumbers its siblings and announces `list.delete`
///
/// A list that is already deleted only republishes the event.
pub async fn delete_list(state: ListState, ctx: RequestContext, req: IdRequest) -> StatusResult<Empty> {
    let board_id = ctx.board()?;

    let mut tx = state.pool.begin().await?;
    // the board may already be gone when a board cascade races this delete
    List::lock_board(&mut *tx, board_id).await?;
    let list = List::find_any(&mut *tx, req.id)
        .await?
        .filter(|list| list.board_id == board_id)
        .ok_or_else(list_not_found)?;

    if list.deleted_at.is_none() {
        let siblings = List::lock_siblings(&mut *tx, board_id).await?;
        List::soft_delete(&mut *tx, list.id).await?;

        let remaining = ordering::without(&ordering::ids_under(&siblings, board_id), list.id);
        let changes = ordering::changed(&siblings, &ordering::layout(board_id, &remaining));
        ordering::persist(&mut *tx, Siblings::Lists, &changes).await?;
    }
    tx.commit().await?;

    tracing::info!(list_id = list.id, board_id, "List deleted");
    publish(&ctx, state.publisher.as_ref(), routing::LIST_DELETE, &req).await?;
    Ok(Empty::default())
}
