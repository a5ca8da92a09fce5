/// Identity service
///
/// Owns users, credentials and tokens, and answers the board role oracle for
/// the other services from the membership table.
///
/// # Example
///
/// ```no_run
/// use kanban_services::identity::{self, IdentityState};
/// use kanban_shared::rpc::server::serve;
/// # use tokio_util::sync::CancellationToken;
///
/// # async fn example(state: IdentityState) -> std::io::Result<()> {
/// let router = identity::rpc_server(state).into_router();
/// serve(router, "0.0.0.0:50051".parse().unwrap(), CancellationToken::new()).await
/// # }
/// ```

pub mod handlers;
pub mod mailer;

use kanban_shared::auth::password::PasswordHasherConfig;
use kanban_shared::authz::oracle::PgRoleOracle;
use kanban_shared::authz::subject::NoSubjects;
use kanban_shared::contracts::common::IdRequest;
use kanban_shared::contracts::identity::{
    method, AuthenticateRequest, ChangeEmailRequest, CheckBoardUserRoleRequest,
    CheckBoardVisibilityRequest, ConfirmNewEmailRequest, CreateUserRequest, LoginRequest,
    RefreshTokenRequest, SERVICE,
};
use kanban_shared::rpc::authorize::{AuthorizationInterceptor, MethodRule};
use kanban_shared::rpc::server::RpcServer;
use kanban_shared::rpc::typed::unary;
use kanban_shared::rpc::validate::ShapeValidator;
use mailer::Mailer;
use sqlx::PgPool;
use std::sync::Arc;

/// Method policies; the role oracle methods are internal and exempt
pub const RULES: &[MethodRule] = &[
    MethodRule::exempt(method::CREATE_USER),
    MethodRule::exempt(method::LOGIN),
    MethodRule::exempt(method::REFRESH_TOKEN),
    MethodRule::exempt(method::AUTHENTICATE),
    MethodRule::authenticated(method::CHANGE_EMAIL),
    MethodRule::exempt(method::CONFIRM_NEW_EMAIL),
    MethodRule::exempt(method::GET_USER_BY_ID),
    MethodRule::exempt(method::CHECK_BOARD_USER_ROLE),
    MethodRule::exempt(method::CHECK_BOARD_VISIBILITY),
];

#[derive(Clone)]
pub struct IdentityState {
    pub pool: PgPool,
    pub secret: Arc<str>,
    pub hasher: PasswordHasherConfig,
    pub mailer: Arc<dyn Mailer>,
    pub oracle: Arc<PgRoleOracle>,
}

impl IdentityState {
    pub fn new(pool: PgPool, secret: impl Into<Arc<str>>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            oracle: Arc::new(PgRoleOracle::new(pool.clone())),
            pool,
            secret: secret.into(),
            hasher: PasswordHasherConfig::from_env(),
            mailer,
        }
    }
}

pub fn validator() -> ShapeValidator {
    ShapeValidator::new()
        .check::<CreateUserRequest>(method::CREATE_USER)
        .check::<LoginRequest>(method::LOGIN)
        .check::<RefreshTokenRequest>(method::REFRESH_TOKEN)
        .check::<AuthenticateRequest>(method::AUTHENTICATE)
        .check::<ChangeEmailRequest>(method::CHANGE_EMAIL)
        .check::<ConfirmNewEmailRequest>(method::CONFIRM_NEW_EMAIL)
        .check::<IdRequest>(method::GET_USER_BY_ID)
        .check::<CheckBoardUserRoleRequest>(method::CHECK_BOARD_USER_ROLE)
        .check::<CheckBoardVisibilityRequest>(method::CHECK_BOARD_VISIBILITY)
}

pub fn rpc_server(state: IdentityState) -> RpcServer {
    let authz = AuthorizationInterceptor::new(RULES, state.oracle.clone(), Arc::new(NoSubjects));

    RpcServer::new(SERVICE)
        .interceptor(validator())
        .interceptor(authz)
        .method(method::CREATE_USER, unary(state.clone(), handlers::create_user))
        .method(method::LOGIN, unary(state.clone(), handlers::login))
        .method(method::REFRESH_TOKEN, unary(state.clone(), handlers::refresh_token))
        .method(method::AUTHENTICATE, unary(state.clone(), handlers::authenticate))
        .method(method::CHANGE_EMAIL, unary(state.clone(), handlers::change_email))
        .method(method::CONFIRM_NEW_EMAIL, unary(state.clone(), handlers::confirm_new_email))
        .method(method::GET_USER_BY_ID, unary(state.clone(), handlers::get_user_by_id))
        .method(method::CHECK_BOARD_USER_ROLE, unary(state.clone(), handlers::check_board_user_role))
        .method(method::CHECK_BOARD_VISIBILITY, unary(state, handlers::check_board_visibility))
}
