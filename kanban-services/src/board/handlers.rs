/// Board service handlers

use super::BoardState;
use crate::support::{ensure_visible, publish, unique_ids};
use kanban_shared::authz::role::{can_assign_role, can_change_role, Role};
use kanban_shared::contracts::board::{
    AddMembersRequest, AddMembersResponse, AssignRoleRequest, BoardDetail, CreateBoardRequest,
    CreateLabelRequest, DeleteLabelRequest, ListBoardsResponse, RemoveMembersRequest,
    RemoveMembersResponse, TransferOwnershipRequest, UpdateBoardRequest,
};
use kanban_shared::contracts::common::{Empty, IdRequest, PageRequest, Pagination};
use kanban_shared::error::{Status, StatusResult};
use kanban_shared::events::routing;
use kanban_shared::models::board::Board;
use kanban_shared::models::board_member::{BoardMember, OwnershipError};
use kanban_shared::models::label::Label;
use kanban_shared::models::user::User;
use kanban_shared::rpc::RequestContext;

fn board_not_found() -> Status {
    Status::not_found("board not found")
}

/// Creates the board and the caller's owner membership in one transaction
pub async fn create_board(state: BoardState, ctx: RequestContext, req: CreateBoardRequest) -> StatusResult<Board> {
    let user_id = ctx.caller()?;

    let mut tx = state.pool.begin().await?;
    let board = Board::create(&mut *tx, &req.name, req.visibility).await?;
    BoardMember::create(&mut *tx, board.id, user_id, Role::Owner).await?;
    tx.commit().await?;

    tracing::info!(board_id = board.id, user_id, "Board created");
    Ok(board)
}

pub async fn list_boards(state: BoardState, ctx: RequestContext, req: PageRequest) -> StatusResult<ListBoardsResponse> {
    let user_id = ctx.caller()?;

    let total = Board::count_for_member(&state.pool, user_id).await?;
    let boards = Board::list_for_member(&state.pool, user_id, req.limit(), req.offset()).await?;

    Ok(ListBoardsResponse {
        boards,
        pagination: Pagination::new(&req, total),
    })
}

pub async fn get_board_by_id(state: BoardState, ctx: RequestContext, req: IdRequest) -> StatusResult<BoardDetail> {
    ensure_visible(state.oracle.as_ref(), &ctx, req.id).await?;

    let board = Board::find_by_id(&state.pool, req.id)
        .await?
        .ok_or_else(board_not_found)?;
    let members = BoardMember::list_for_board(&state.pool, board.id).await?;
    let labels = Label::list_by_board(&state.pool, board.id).await?;

    Ok(BoardDetail { board, members, labels })
}

pub async fn update_board(state: BoardState, _ctx: RequestContext, req: UpdateBoardRequest) -> StatusResult<Board> {
    if req.name.is_none() && req.visibility.is_none() {
        return Board::find_by_id(&state.pool, req.id)
            .await?
            .ok_or_else(board_not_found);
    }

    let mut board = None;
    if let Some(name) = &req.name {
        board = Board::rename(&state.pool, req.id, name).await?;
    }
    if let Some(visibility) = req.visibility {
        board = Board::set_visibility(&state.pool, req.id, visibility).await?;
    }

    let board = board.ok_or_else(board_not_found)?;
    tracing::info!(board_id = board.id, "Board updated");
    Ok(board)
}

pub async fn archive_board(state: BoardState, _ctx: RequestContext, req: IdRequest) -> StatusResult<Board> {
    let board = Board::set_archived(&state.pool, req.id, true)
        .await?
        .ok_or_else(board_not_found)?;
    tracing::info!(board_id = board.id, "Board archived");
    Ok(board)
}

pub async fn restore_board(state: BoardState, _ctx: RequestContext, req: IdRequest) -> StatusResult<Board> {
    let board = Board::set_archived(&state.pool, req.id, false)
        .await?
        .ok_or_else(board_not_found)?;
    tracing::info!(board_id = board.id, "Board restored");
    Ok(board)
}

/// Soft-deletes an archived board and announces `board.delete`
///
/// Deleting an already deleted board republishes the event, so a retry
/// after a broker failure completes the cascade. Memberships and labels are
/// kept.
pub async fn delete_board(state: BoardState, ctx: RequestContext, req: IdRequest) -> StatusResult<Empty> {
    let mut tx = state.pool.begin().await?;
    let board = Board::find_any(&mut *tx, req.id)
        .await?
        .ok_or_else(board_not_found)?;

    if board.deleted_at.is_none() {
        if !board.archived {
            return Err(Status::conflict("board must be archived before it can be deleted"));
        }
        Board::soft_delete(&mut *tx, board.id).await?;
    }
    tx.commit().await?;

    tracing::info!(board_id = board.id, "Board deleted");
    publish(&ctx, state.publisher.as_ref(), routing::BOARD_DELETE, &req).await?;
    Ok(Empty::default())
}

pub async fn add_members(
    state: BoardState,
    ctx: RequestContext,
    req: AddMembersRequest,
) -> StatusResult<AddMembersResponse> {
    let actor = ctx.role()?;
    if !can_assign_role(actor, req.role) {
        return Err(Status::forbidden(format!("{} cannot grant the {} role", actor, req.role)));
    }

    let ids = unique_ids(&req.user_ids);
    let known = User::existing_ids(&state.pool, &ids).await?;
    let unknown: Vec<i64> = ids.iter().copied().filter(|id| !known.contains(id)).collect();
    if !unknown.is_empty() {
        return Err(Status::not_found(format!("unknown users: {:?}", unknown)));
    }

    let mut tx = state.pool.begin().await?;
    let existing = BoardMember::lock_roles(&mut *tx, req.id, &ids).await?;
    if !existing.is_empty() {
        let members: Vec<i64> = existing.iter().map(|(id, _)| *id).collect();
        return Err(Status::conflict(format!("already members: {:?}", members)));
    }
    let added = BoardMember::add_many(&mut *tx, req.id, &ids, req.role).await?;
    tx.commit().await?;

    tracing::info!(board_id = req.id, added = added.len(), role = %req.role, "Members added");
    Ok(AddMembersResponse { added })
}

/// Targets must rank strictly below the actor; anyone but the owner may
/// remove themselves
fn check_removals(actor_id: i64, actor: Role, targets: &[(i64, Role)]) -> StatusResult<()> {
    for (user_id, role) in targets {
        if *role == Role::Owner {
            return Err(Status::precondition_failed("the board owner cannot be removed"));
        }
        if *user_id != actor_id && !can_assign_role(actor, *role) {
            return Err(Status::forbidden(format!("{} cannot remove a member with the {} role", actor, role)));
        }
    }
    Ok(())
}

pub async fn remove_members(
    state: BoardState,
    ctx: RequestContext,
    req: RemoveMembersRequest,
) -> StatusResult<RemoveMembersResponse> {
    let actor_id = ctx.caller()?;
    let actor = ctx.role()?;
    let ids = unique_ids(&req.user_ids);

    let mut tx = state.pool.begin().await?;
    let targets = BoardMember::lock_roles(&mut *tx, req.id, &ids).await?;
    check_removals(actor_id, actor, &targets)?;

    let removed = BoardMember::remove_many(&mut *tx, req.id, &ids).await?;
    tx.commit().await?;

    tracing::info!(board_id = req.id, removed = removed.len(), "Members removed");
    Ok(RemoveMembersResponse { removed })
}

pub async fn assign_role(state: BoardState, ctx: RequestContext, req: AssignRoleRequest) -> StatusResult<BoardMember> {
    let actor = ctx.role()?;
    if req.role == Role::Owner {
        return Err(Status::forbidden("ownership changes hands only through a transfer"));
    }

    let mut tx = state.pool.begin().await?;
    let current = BoardMember::lock_roles(&mut *tx, req.id, &[req.user_id])
        .await?
        .first()
        .map(|(_, role)| *role)
        .ok_or_else(|| Status::not_found("user is not a member of this board"))?;

    if !can_change_role(actor, current, req.role) {
        return Err(Status::forbidden(format!(
            "{} cannot change a {} to {}",
            actor, current, req.role
        )));
    }

    let member = BoardMember::set_role(&mut *tx, req.id, req.user_id, req.role).await?;
    tx.commit().await?;

    tracing::info!(board_id = req.id, user_id = req.user_id, role = %req.role, "Role assigned");
    Ok(member)
}

pub async fn transfer_ownership(
    state: BoardState,
    ctx: RequestContext,
    req: TransferOwnershipRequest,
) -> StatusResult<Empty> {
    let owner = ctx.caller()?;

    BoardMember::transfer_ownership(&state.pool, req.id, owner, req.new_owner_id)
        .await
        .map_err(|e| match e {
            OwnershipError::NotOwner => Status::forbidden("only the owner can transfer ownership"),
            OwnershipError::NotMember => Status::precondition_failed("the new owner must be a board member"),
            OwnershipError::Database(e) => e.into(),
        })?;

    tracing::info!(board_id = req.id, from = owner, to = req.new_owner_id, "Ownership transferred");
    Ok(Empty::default())
}

pub async fn create_label(state: BoardState, _ctx: RequestContext, req: CreateLabelRequest) -> StatusResult<Label> {
    if Board::find_by_id(&state.pool, req.id).await?.is_none() {
        return Err(board_not_found());
    }
    Ok(Label::create(&state.pool, req.id, &req.name, &req.color).await?)
}

pub async fn delete_label(state: BoardState, _ctx: RequestContext, req: DeleteLabelRequest) -> StatusResult<Empty> {
    if !Label::delete(&state.pool, req.id, req.label_id).await? {
        return Err(Status::not_found("label not found"));
    }
    tracing::info!(board_id = req.id, label_id = req.label_id, "Label deleted");
    Ok(Empty::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_shared::error::Code;

    #[test]
    fn test_owner_is_never_removable() {
        let err = check_removals(1, Role::Owner, &[(1, Role::Owner)]).unwrap_err();
        assert_eq!(err.code, Code::PreconditionFailed);

        let err = check_removals(1, Role::Admin, &[(2, Role::Owner)]).unwrap_err();
        assert_eq!(err.code, Code::PreconditionFailed);
    }

    #[test]
    fn test_removal_requires_outranking_the_target() {
        assert!(check_removals(1, Role::Admin, &[(2, Role::Member), (3, Role::Observer)]).is_ok());

        let err = check_removals(1, Role::Admin, &[(2, Role::Member), (3, Role::Admin)]).unwrap_err();
        assert_eq!(err.code, Code::Forbidden);
    }

    #[test]
    fn test_admin_may_leave() {
        assert!(check_removals(4, Role::Admin, &[(4, Role::Admin)]).is_ok());
    }
}
