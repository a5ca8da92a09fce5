/// Card endpoints
///
/// Cards, their labels, comments and attachment metadata. Like list routes,
/// mutations need `?boardId=`.

use super::BoardScope;
use crate::{
    app::AppState,
    error::{ApiJson, ApiPath, ApiQuery, ApiResult},
    middleware::auth::CallContext,
};
use axum::{extract::State, http::StatusCode, Json};
use kanban_shared::contracts::card::{
    CardDetail, CardLabelRequest, CardsResponse, CreateAttachmentRequest, CreateCardRequest,
    CreateCommentRequest, DeleteAttachmentRequest, DeleteCommentRequest, GetCardsByListRequest,
    MoveCardRequest, MoveCardResponse, UpdateCardRequest,
};
use kanban_shared::contracts::common::IdRequest;
use kanban_shared::models::attachment::Attachment;
use kanban_shared::models::card::Card;
use kanban_shared::models::comment::Comment;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardsQuery {
    pub list_id: i64,
    #[serde(default)]
    pub include_archived: bool,
    #[serde(default)]
    pub board_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBody {
    pub new_position: i64,
    #[serde(default)]
    pub list_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentBody {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
}

pub async fn create_card(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiQuery(scope): ApiQuery<BoardScope>,
    ApiJson(req): ApiJson<CreateCardRequest>,
) -> ApiResult<(StatusCode, Json<Card>)> {
    let md = ctx.on_board(scope.required()?);
    let card = state.clients.card().await?.create_card(&md, &req).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn get_cards(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiQuery(query): ApiQuery<CardsQuery>,
) -> ApiResult<Json<CardsResponse>> {
    let req = GetCardsByListRequest {
        list_id: query.list_id,
        include_archived: query.include_archived,
    };
    let cards = state
        .clients
        .card()
        .await?
        .get_cards_by_list(&ctx.on_optional_board(query.board_id), &req)
        .await?;
    Ok(Json(cards))
}

pub async fn get_card(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<BoardScope>,
) -> ApiResult<Json<CardDetail>> {
    let card = state
        .clients
        .card()
        .await?
        .get_card_by_id(&ctx.on_optional_board(scope.board_id), &IdRequest::new(id))
        .await?;
    Ok(Json(card))
}

/// Partial update; the path id overrides any id in the body
pub async fn update_card(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<BoardScope>,
    ApiJson(mut req): ApiJson<UpdateCardRequest>,
) -> ApiResult<Json<Card>> {
    let md = ctx.on_board(scope.required()?);
    req.id = id;
    let card = state.clients.card().await?.update_card(&md, &req).await?;
    Ok(Json(card))
}

/// Returns every card of the lists whose layout changed
pub async fn move_card(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<BoardScope>,
    ApiJson(body): ApiJson<MoveBody>,
) -> ApiResult<Json<MoveCardResponse>> {
    let md = ctx.on_board(scope.required()?);
    let req = MoveCardRequest {
        id,
        new_position: body.new_position,
        list_id: body.list_id,
    };
    let moved = state.clients.card().await?.move_card(&md, &req).await?;
    Ok(Json(moved))
}

pub async fn archive_card(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<BoardScope>,
) -> ApiResult<Json<Card>> {
    let md = ctx.on_board(scope.required()?);
    let card = state.clients.card().await?.archive_card(&md, &IdRequest::new(id)).await?;
    Ok(Json(card))
}

pub async fn restore_card(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<BoardScope>,
) -> ApiResult<Json<Card>> {
    let md = ctx.on_board(scope.required()?);
    let card = state.clients.card().await?.restore_card(&md, &IdRequest::new(id)).await?;
    Ok(Json(card))
}

pub async fn delete_card(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<BoardScope>,
) -> ApiResult<StatusCode> {
    let md = ctx.on_board(scope.required()?);
    state.clients.card().await?.delete_card(&md, &IdRequest::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_label(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath((id, label_id)): ApiPath<(i64, i64)>,
    ApiQuery(scope): ApiQuery<BoardScope>,
) -> ApiResult<StatusCode> {
    let md = ctx.on_board(scope.required()?);
    state
        .clients
        .card()
        .await?
        .add_card_label(&md, &CardLabelRequest { id, label_id })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_label(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath((id, label_id)): ApiPath<(i64, i64)>,
    ApiQuery(scope): ApiQuery<BoardScope>,
) -> ApiResult<StatusCode> {
    let md = ctx.on_board(scope.required()?);
    state
        .clients
        .card()
        .await?
        .remove_card_label(&md, &CardLabelRequest { id, label_id })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_comment(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<BoardScope>,
    ApiJson(body): ApiJson<CommentBody>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let md = ctx.on_board(scope.required()?);
    let req = CreateCommentRequest {
        id,
        content: body.content,
    };
    let comment = state.clients.card().await?.create_comment(&md, &req).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Authors may delete their own comments; admins may delete any
pub async fn delete_comment(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath((id, comment_id)): ApiPath<(i64, i64)>,
    ApiQuery(scope): ApiQuery<BoardScope>,
) -> ApiResult<StatusCode> {
    let md = ctx.on_board(scope.required()?);
    state
        .clients
        .card()
        .await?
        .delete_comment(&md, &DeleteCommentRequest { id, comment_id })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_attachment(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<BoardScope>,
    ApiJson(body): ApiJson<AttachmentBody>,
) -> ApiResult<(StatusCode, Json<Attachment>)> {
    let md = ctx.on_board(scope.required()?);
    let req = CreateAttachmentRequest {
        id,
        file_name: body.file_name,
        content_type: body.content_type,
        size_bytes: body.size_bytes,
        storage_key: body.storage_key,
    };
    let attachment = state.clients.card().await?.create_attachment(&md, &req).await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

pub async fn delete_attachment(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiPath((id, attachment_id)): ApiPath<(i64, i64)>,
    ApiQuery(scope): ApiQuery<BoardScope>,
) -> ApiResult<StatusCode> {
    let md = ctx.on_board(scope.required()?);
    state
        .clients
        .card()
        .await?
        .delete_attachment(&md, &DeleteAttachmentRequest { id, attachment_id })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
