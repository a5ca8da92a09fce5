/// Identity service handlers

use super::IdentityState;
use chrono::Utc;
use kanban_shared::auth::jwt::{create_token, validate_access_token, validate_refresh_token, Claims, TokenType};
use kanban_shared::auth::password::{verify_password, PasswordHasherConfig};
use kanban_shared::auth::tokens::{
    constant_time_compare, email_token_ttl, generate_email_token, hash_token, is_email_token_expired,
    is_reissue_throttled,
};
use kanban_shared::authz::oracle::{RoleCheck, RoleOracle, VisibilityCheck};
use kanban_shared::contracts::common::IdRequest;
use kanban_shared::contracts::identity::{
    AuthenticateRequest, AuthenticateResponse, ChangeEmailRequest, ChangeEmailResponse,
    CheckBoardUserRoleRequest, CheckBoardVisibilityRequest, ConfirmNewEmailRequest, CreateUserRequest,
    LoginRequest, RefreshTokenRequest, TokenPair,
};
use kanban_shared::error::{Status, StatusResult};
use kanban_shared::models::refresh_token::RefreshToken;
use kanban_shared::models::user::{CreateUser, User};
use kanban_shared::rpc::RequestContext;

const BAD_CREDENTIALS: &str = "invalid username or password";

async fn hash_password(hasher: PasswordHasherConfig, password: String) -> StatusResult<String> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| Status::internal(format!("hashing task failed: {}", e)))?
        .map_err(|e| Status::internal(e.to_string()))
}

async fn check_password(password: String, hash: String) -> StatusResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| Status::internal(format!("verification task failed: {}", e)))?
        .map_err(|e| Status::internal(e.to_string()))
}

/// Signs an access/refresh pair and stores the refresh digest
async fn issue_tokens(state: &IdentityState, user_id: i64) -> StatusResult<TokenPair> {
    let access = Claims::new(user_id, TokenType::Access);
    let refresh = Claims::new(user_id, TokenType::Refresh);

    let access_token = create_token(&access, &state.secret).map_err(|e| Status::internal(e.to_string()))?;
    let refresh_token = create_token(&refresh, &state.secret).map_err(|e| Status::internal(e.to_string()))?;

    RefreshToken::create(&state.pool, user_id, &hash_token(&refresh_token), refresh.expires_at()).await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: TokenType::Access.default_expiration().num_seconds(),
    })
}

pub async fn create_user(state: IdentityState, _ctx: RequestContext, req: CreateUserRequest) -> StatusResult<User> {
    if User::find_by_username(&state.pool, &req.username).await?.is_some() {
        return Err(Status::conflict("username already taken"));
    }
    {
        let mut conn = state.pool.acquire().await?;
        if User::email_in_use(&mut *conn, &req.email, None).await? {
            return Err(Status::conflict("email already in use"));
        }
    }

    let password_hash = hash_password(state.hasher, req.password).await?;

    // a concurrent registration still trips the unique indexes
    let user = User::create(
        &state.pool,
        CreateUser {
            username: req.username,
            email: req.email,
            full_name: req.full_name,
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User created");
    Ok(user)
}

pub async fn login(state: IdentityState, _ctx: RequestContext, req: LoginRequest) -> StatusResult<TokenPair> {
    let user = User::find_by_username(&state.pool, &req.username)
        .await?
        .ok_or_else(|| Status::unauthenticated(BAD_CREDENTIALS))?;

    if !check_password(req.password, user.password_hash.clone()).await? {
        tracing::debug!(user_id = user.id, "Login rejected");
        return Err(Status::unauthenticated(BAD_CREDENTIALS));
    }

    let tokens = issue_tokens(&state, user.id).await?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok(tokens)
}

/// Rotates the pair: the presented refresh token is revoked
pub async fn refresh_token(
    state: IdentityState,
    _ctx: RequestContext,
    req: RefreshTokenRequest,
) -> StatusResult<TokenPair> {
    let claims = validate_refresh_token(&req.refresh_token, &state.secret)
        .map_err(|e| Status::unauthenticated(format!("invalid refresh token: {}", e)))?;

    let stored = RefreshToken::find_active(&state.pool, &hash_token(&req.refresh_token))
        .await?
        .filter(|t| t.user_id == claims.sub)
        .ok_or_else(|| Status::unauthenticated("refresh token is unknown or revoked"))?;

    if !RefreshToken::revoke(&state.pool, stored.id).await? {
        return Err(Status::unauthenticated("refresh token is unknown or revoked"));
    }

    issue_tokens(&state, claims.sub).await
}

pub async fn authenticate(
    state: IdentityState,
    _ctx: RequestContext,
    req: AuthenticateRequest,
) -> StatusResult<AuthenticateResponse> {
    let claims = validate_access_token(&req.token, &state.secret)
        .map_err(|e| Status::unauthenticated(format!("invalid access token: {}", e)))?;

    if User::find_by_id(&state.pool, claims.sub).await?.is_none() {
        return Err(Status::unauthenticated("user no longer exists"));
    }

    Ok(AuthenticateResponse { user_id: claims.sub })
}

/// Stores a pending email and sends a confirmation token to it
pub async fn change_email(
    state: IdentityState,
    ctx: RequestContext,
    req: ChangeEmailRequest,
) -> StatusResult<ChangeEmailResponse> {
    let user_id = ctx.caller()?;
    let now = Utc::now();

    let mut tx = state.pool.begin().await?;
    let user = User::lock_by_id(&mut *tx, user_id)
        .await?
        .ok_or_else(|| Status::not_found("user not found"))?;

    if user.email.eq_ignore_ascii_case(&req.new_email) {
        return Err(Status::precondition_failed("new email matches the current email"));
    }
    if is_reissue_throttled(user.email_token_issued_at, now) {
        return Err(Status::precondition_failed(
            "a confirmation was sent less than a minute ago",
        ));
    }
    if User::email_in_use(&mut *tx, &req.new_email, Some(user_id)).await? {
        return Err(Status::conflict("email already in use"));
    }

    let token = generate_email_token();
    let updated = User::set_pending_email(&mut *tx, user_id, &req.new_email, &hash_token(&token)).await?;
    tx.commit().await?;

    state
        .mailer
        .send_email_confirmation(&updated, &req.new_email, &token)
        .await
        .map_err(|e| Status::unavailable(e.to_string()))?;

    let issued_at = updated.email_token_issued_at.unwrap_or(now);
    tracing::info!(user_id, "Email change requested");

    Ok(ChangeEmailResponse {
        new_email: req.new_email,
        token_expires_at: issued_at + email_token_ttl(),
    })
}

pub async fn confirm_new_email(
    state: IdentityState,
    _ctx: RequestContext,
    req: ConfirmNewEmailRequest,
) -> StatusResult<User> {
    let mut tx = state.pool.begin().await?;
    let user = User::lock_by_id(&mut *tx, req.user_id)
        .await?
        .ok_or_else(|| Status::not_found("user not found"))?;

    let (new_email, digest, issued_at) = match (&user.new_email, &user.email_token, user.email_token_issued_at) {
        (Some(email), Some(digest), Some(at)) => (email.clone(), digest.clone(), at),
        _ => return Err(Status::precondition_failed("no pending email change")),
    };

    if !constant_time_compare(&digest, &hash_token(&req.token)) {
        return Err(Status::forbidden("invalid confirmation token"));
    }
    if is_email_token_expired(issued_at, Utc::now()) {
        return Err(Status::precondition_failed("confirmation token expired"));
    }
    if User::email_in_use(&mut *tx, &new_email, Some(user.id)).await? {
        return Err(Status::conflict("email already in use"));
    }

    let confirmed = User::confirm_new_email(&mut *tx, user.id).await?;
    tx.commit().await?;

    tracing::info!(user_id = confirmed.id, "Email change confirmed");
    Ok(confirmed)
}

pub async fn get_user_by_id(state: IdentityState, _ctx: RequestContext, req: IdRequest) -> StatusResult<User> {
    User::find_by_id(&state.pool, req.id)
        .await?
        .ok_or_else(|| Status::not_found("user not found"))
}

pub async fn check_board_user_role(
    state: IdentityState,
    ctx: RequestContext,
    req: CheckBoardUserRoleRequest,
) -> StatusResult<RoleCheck> {
    let md = ctx.outgoing();
    let check = state
        .oracle
        .check_board_user_role(&md, req.user_id, req.board_id, req.required_role)
        .await?;
    Ok(check)
}

pub async fn check_board_visibility(
    state: IdentityState,
    ctx: RequestContext,
    req: CheckBoardVisibilityRequest,
) -> StatusResult<VisibilityCheck> {
    let md = ctx.outgoing();
    let check = state
        .oracle
        .check_board_visibility(&md, req.user_id, req.board_id)
        .await?;
    Ok(check)
}
