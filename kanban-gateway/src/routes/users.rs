/// User endpoints
///
/// - `POST /user/create` (public): `{username, password, email, fullname}`
/// - `PUT /user/confirm-new-email` (public): `{userID, token}`
/// - `PUT /user/email` (bearer): `{newEmail}`

use crate::{
    app::AppState,
    error::{ApiJson, ApiResult},
    middleware::auth::CallContext,
};
use axum::{extract::State, http::StatusCode, Json};
use kanban_shared::contracts::identity::{
    ChangeEmailRequest, ChangeEmailResponse, ConfirmNewEmailRequest, CreateUserRequest,
};
use kanban_shared::models::user::User;

pub async fn create_user(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.clients.identity().await?.create_user(&ctx.metadata, &req).await?;
    tracing::info!(user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn confirm_new_email(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiJson(req): ApiJson<ConfirmNewEmailRequest>,
) -> ApiResult<Json<User>> {
    let user = state
        .clients
        .identity()
        .await?
        .confirm_new_email(&ctx.metadata, &req)
        .await?;
    Ok(Json(user))
}

pub async fn change_email(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiJson(req): ApiJson<ChangeEmailRequest>,
) -> ApiResult<Json<ChangeEmailResponse>> {
    ctx.caller()?;
    let pending = state.clients.identity().await?.change_email(&ctx.metadata, &req).await?;
    Ok(Json(pending))
}
