/// List endpoints
///
/// Mutations need `?boardId=`; reads take it when given.

use super::BoardScope;
use crate::{
    app::AppState,
    error::{ApiJson, ApiPath, ApiQuery, ApiResult},
    middleware::auth::CallContext,
};
use axum::{extract::State, http::StatusCode, Json};
use kanban_shared::contracts::common::IdRequest;
use kanban_shared::contracts::list::{
    CreateListRequest, GetListsByBoardRequest, ListsResponse, MoveListRequest, UpdateListRequest,
};
use kanban_shared::models::list::List;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListsQuery {
    pub board_id: i64,
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Deserialize)]
pub struct RenameBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionBody {
    pub new_position: i64,
}

/// The body names the board; `?boardId=` wins when both are present
pub async fn create_list(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiQuery(scope): ApiQuery<BoardScope>,
    ApiJson(req): ApiJson<CreateListRequest>,
) -> ApiResult<(StatusCode, Json<List>)> {
    let board_id = scope.board_id.unwrap_or(req.board_id);
    let list = state.clients.list().await?.create_list(&ctx.on_board(board_id), &req).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

pub async fn get_lists(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiQuery(query): ApiQuery<ListsQuery>,
) -> ApiResult<Json<ListsResponse>> {
    let req = GetListsByBoardRequest {
        board_id: query.board_id,
        include_archived: query.include_archived,
    };
    let lists = state
        .clients
        .list()
        .await?
        .get_lists_by_board(&ctx.on_board(query.board_id), &req)
        .await?;
    Ok(Json(lists))
}

pub async fn get_list(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<BoardScope>,
) -> ApiResult<Json<List>> {
    let list = state
        .clients
        .list()
        .await?
        .get_list_by_id(&ctx.on_optional_board(scope.board_id), &IdRequest::new(id))
        .await?;
    Ok(Json(list))
}

pub async fn update_list(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<BoardScope>,
    ApiJson(body): ApiJson<RenameBody>,
) -> ApiResult<Json<List>> {
    let md = ctx.on_board(scope.required()?);
    let req = UpdateListRequest { id, name: body.name };
    let list = state.clients.list().await?.update_list(&md, &req).await?;
    Ok(Json(list))
}

pub async fn move_list(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<BoardScope>,
    ApiJson(body): ApiJson<PositionBody>,
) -> ApiResult<Json<ListsResponse>> {
    let md = ctx.on_board(scope.required()?);
    let req = MoveListRequest {
        id,
        new_position: body.new_position,
    };
    let lists = state.clients.list().await?.move_list(&md, &req).await?;
    Ok(Json(lists))
}

pub async fn archive_list(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<BoardScope>,
) -> ApiResult<Json<List>> {
    let md = ctx.on_board(scope.required()?);
    let list = state.clients.list().await?.archive_list(&md, &IdRequest::new(id)).await?;
    Ok(Json(list))
}

pub async fn restore_list(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<BoardScope>,
) -> ApiResult<Json<List>> {
    let md = ctx.on_board(scope.required()?);
    let list = state.clients.list().await?.restore_list(&md, &IdRequest::new(id)).await?;
    Ok(Json(list))
}

pub async fn delete_list(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<BoardScope>,
) -> ApiResult<StatusCode> {
    let md = ctx.on_board(scope.required()?);
    state.clients.list().await?.delete_list(&md, &IdRequest::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
