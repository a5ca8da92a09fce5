/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /auth/login` - exchange username and password for a token pair
/// - `POST /auth/refresh` - exchange a refresh token for a new pair
///
/// Both are public; the identity service does the checking.

use crate::{
    app::AppState,
    error::{ApiJson, ApiResult},
    middleware::auth::CallContext,
};
use axum::{extract::State, Json};
use kanban_shared::contracts::identity::{LoginRequest, RefreshTokenRequest, TokenPair};

/// Login handler
///
/// Unknown users and wrong passwords both come back as 401 with the same
/// message.
pub async fn login(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    let username = req.username.clone();
    let tokens = state.clients.identity().await?.login(&ctx.metadata, &req).await?;
    tracing::info!(username = %username, "User logged in");
    Ok(Json(tokens))
}

pub async fn refresh(
    State(state): State<AppState>,
    ctx: CallContext,
    ApiJson(req): ApiJson<RefreshTokenRequest>,
) -> ApiResult<Json<TokenPair>> {
    let tokens = state
        .clients
        .identity()
        .await?
        .refresh_token(&ctx.metadata, &req)
        .await?;
    Ok(Json(tokens))
}
