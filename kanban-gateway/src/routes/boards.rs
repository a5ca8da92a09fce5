/// Board endpoints
///
/// | Route | RPC |
/// |---|---|
/// | `POST /boards/` | CreateBoard |
/// | `GET /boards/?page_number&page_size` | ListBoards |
/// | `GET /boards/:id` | GetBoardById |
/// | `PUT /boards/:id` | UpdateBoard |
/// | `DELETE /boards/:id` | DeleteBoard |
/// | `PUT /boards/:id/archive`, `/restore` | ArchiveBoard, RestoreBoard |
/// | `POST /boards/:id/users`, `DELETE /boards/:id/users` | AddMembers, RemoveMembers |
/// | `PUT /boards/:id/users/:userId` | AssignRole |
/// | `PUT /boards/:id/owner` | TransferOwnership |
/// | `POST /boards/:id/labels`, `DELETE /boards/:id/labels/:labelId` | CreateLabel, DeleteLabel |
///
/// The board in the path is also the call's board scope.

use crate::{
    app::AppState,
    error::{ApiJson, ApiPath, ApiQuery, ApiResult},
    middleware::auth::CallContext,
};
use axum::{extract::State, http::StatusCode, Json};
use kanban_shared::authz::role::Role;
use kanban_shared::contracts::board::{
    AddMembersRequest, AddMembersResponse, AssignRoleRequest, BoardDetail, CreateBoardRequest,
    CreateLabelRequest, DeleteLabelRequest, ListBoardsResponse, RemoveMembersRequest,
    RemoveMembersResponse, TransferOwnershipRequest, UpdateBoardRequest,
};
use kanban_shared::contracts::common::{IdRequest, PageRequest};
use kanban_shared::models::board::{Board, Visibility};
use kanban_shared::models::board_member::BoardMember;
use kanban_shared::models::label::Label;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        let defaults = PageRequest::default();
        PageRequest {
            page_number: query.page_number.unwrap_or(defaults.page_number),
            page_size: query.page_size.unwrap_or(defaults.page_size),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BoardPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersBody {
    pub user_ids: Vec<i64>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerBody {
    pub new_owner_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LabelBody {
    pub name: String,
    pub color: String,
}

pub async fn create_board(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiJson(req): ApiJson<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<Board>)> {
    let board = state.clients.board().await?.create_board(&ctx.metadata, &req).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

pub async fn list_boards(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<ListBoardsResponse>> {
    let page = PageRequest::from(query);
    let boards = state.clients.board().await?.list_boards(&ctx.metadata, &page).await?;
    Ok(Json(boards))
}

pub async fn get_board(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<BoardDetail>> {
    let board = state
        .clients
        .board()
        .await?
        .get_board_by_id(&ctx.on_board(id), &IdRequest::new(id))
        .await?;
    Ok(Json(board))
}

pub async fn update_board(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<BoardPatch>,
) -> ApiResult<Json<Board>> {
    let req = UpdateBoardRequest {
        id,
        name: patch.name,
        visibility: patch.visibility,
    };
    let board = state.clients.board().await?.update_board(&ctx.on_board(id), &req).await?;
    Ok(Json(board))
}

pub async fn archive_board(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Board>> {
    let board = state
        .clients
        .board()
        .await?
        .archive_board(&ctx.on_board(id), &IdRequest::new(id))
        .await?;
    Ok(Json(board))
}

pub async fn restore_board(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Board>> {
    let board = state
        .clients
        .board()
        .await?
        .restore_board(&ctx.on_board(id), &IdRequest::new(id))
        .await?;
    Ok(Json(board))
}

/// Only archived boards can be deleted; anything else is a 409
pub async fn delete_board(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state
        .clients
        .board()
        .await?
        .delete_board(&ctx.on_board(id), &IdRequest::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_members(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<MembersBody>,
) -> ApiResult<Json<AddMembersResponse>> {
    let req = AddMembersRequest {
        id,
        user_ids: body.user_ids,
        role: body.role.unwrap_or(Role::Member),
    };
    let added = state.clients.board().await?.add_members(&ctx.on_board(id), &req).await?;
    Ok(Json(added))
}

pub async fn remove_members(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<MembersBody>,
) -> ApiResult<Json<RemoveMembersResponse>> {
    let req = RemoveMembersRequest {
        id,
        user_ids: body.user_ids,
    };
    let removed = state
        .clients
        .board()
        .await?
        .remove_members(&ctx.on_board(id), &req)
        .await?;
    Ok(Json(removed))
}

pub async fn assign_role(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath((id, user_id)): ApiPath<(i64, i64)>,
    ApiJson(body): ApiJson<RoleBody>,
) -> ApiResult<Json<BoardMember>> {
    let req = AssignRoleRequest {
        id,
        user_id,
        role: body.role,
    };
    let member = state.clients.board().await?.assign_role(&ctx.on_board(id), &req).await?;
    Ok(Json(member))
}

pub async fn transfer_ownership(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<OwnerBody>,
) -> ApiResult<StatusCode> {
    let req = TransferOwnershipRequest {
        id,
        new_owner_id: body.new_owner_id,
    };
    state
        .clients
        .board()
        .await?
        .transfer_ownership(&ctx.on_board(id), &req)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_label(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<LabelBody>,
) -> ApiResult<(StatusCode, Json<Label>)> {
    let req = CreateLabelRequest {
        id,
        name: body.name,
        color: body.color,
    };
    let label = state.clients.board().await?.create_label(&ctx.on_board(id), &req).await?;
    Ok((StatusCode::CREATED, Json(label)))
}

pub async fn delete_label(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath((id, label_id)): ApiPath<(i64, i64)>,
) -> ApiResult<StatusCode> {
    let req = DeleteLabelRequest { id, label_id };
    state.clients.board().await?.delete_label(&ctx.on_board(id), &req).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults() {
        let page = PageRequest::from(PageQuery::default());
        assert_eq!(page, PageRequest::default());

        let page = PageRequest::from(PageQuery {
            page_number: Some(3),
            page_size: None,
        });
        assert_eq!((page.page_number, page.page_size), (3, 10));
    }

    #[test]
    fn test_members_body_role_is_optional() {
        let body: MembersBody = serde_json::from_str(r#"{"userIds": [2, 3]}"#).unwrap();
        assert_eq!(body.user_ids, vec![2, 3]);
        assert!(body.role.is_none());
    }
}
