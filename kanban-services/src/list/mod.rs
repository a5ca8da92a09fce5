/// List service
///
/// Lists and their dense ordering within a board. Consumes `board.*` to
/// cascade board deletion; announces `list.delete` for the card service.

pub mod consumer;
pub mod handlers;

use kanban_shared::authz::oracle::RoleOracle;
use kanban_shared::authz::role::Role;
use kanban_shared::authz::subject::PgSubjectResolver;
use kanban_shared::contracts::common::IdRequest;
use kanban_shared::contracts::list::{
    method, CreateListRequest, GetListsByBoardRequest, MoveListRequest, UpdateListRequest, SERVICE,
};
use kanban_shared::events::EventPublisher;
use kanban_shared::rpc::authorize::{AuthorizationInterceptor, MethodRule, Subject};
use kanban_shared::rpc::server::RpcServer;
use kanban_shared::rpc::typed::unary;
use kanban_shared::rpc::validate::ShapeValidator;
use sqlx::PgPool;
use std::sync::Arc;

const LIST: Subject = Subject::List("id");

pub const RULES: &[MethodRule] = &[
    MethodRule::role(method::CREATE_LIST, Role::Member, Subject::Board("boardId")),
    MethodRule::exempt(method::GET_LIST_BY_ID),
    MethodRule::exempt(method::GET_LISTS_BY_BOARD),
    MethodRule::role(method::UPDATE_LIST, Role::Member, LIST),
    MethodRule::role(method::MOVE_LIST, Role::Member, LIST),
    MethodRule::role(method::ARCHIVE_LIST, Role::Member, LIST),
    MethodRule::role(method::RESTORE_LIST, Role::Member, LIST),
    MethodRule::role(method::DELETE_LIST, Role::Admin, LIST),
];

#[derive(Clone)]
pub struct ListState {
    pub pool: PgPool,
    pub publisher: Arc<dyn EventPublisher>,
    pub oracle: Arc<dyn RoleOracle>,
}

pub fn validator() -> ShapeValidator {
    ShapeValidator::new()
        .check::<CreateListRequest>(method::CREATE_LIST)
        .check::<IdRequest>(method::GET_LIST_BY_ID)
        .check::<GetListsByBoardRequest>(method::GET_LISTS_BY_BOARD)
        .check::<UpdateListRequest>(method::UPDATE_LIST)
        .check::<MoveListRequest>(method::MOVE_LIST)
        .check::<IdRequest>(method::ARCHIVE_LIST)
        .check::<IdRequest>(method::RESTORE_LIST)
        .check::<IdRequest>(method::DELETE_LIST)
}

pub fn rpc_server(state: ListState) -> RpcServer {
    let resolver = Arc::new(PgSubjectResolver::new(state.pool.clone()));
    let authz = AuthorizationInterceptor::new(RULES, state.oracle.clone(), resolver);

    RpcServer::new(SERVICE)
        .interceptor(validator())
        .interceptor(authz)
        .method(method::CREATE_LIST, unary(state.clone(), handlers::create_list))
        .method(method::GET_LIST_BY_ID, unary(state.clone(), handlers::get_list_by_id))
        .method(method::GET_LISTS_BY_BOARD, unary(state.clone(), handlers::get_lists_by_board))
        .method(method::UPDATE_LIST, unary(state.clone(), handlers::update_list))
        .method(method::MOVE_LIST, unary(state.clone(), handlers::move_list))
        .method(method::ARCHIVE_LIST, unary(state.clone(), handlers::archive_list))
        .method(method::RESTORE_LIST, unary(state.clone(), handlers::restore_list))
        .method(method::DELETE_LIST, unary(state, handlers::delete_list))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::testing::{lazy_pool, StaticOracle};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use kanban_shared::contracts::list::METHODS;
    use kanban_shared::events::memory::MemoryPublisher;
    use kanban_shared::rpc::authorize::coverage_gaps;
    use tower::ServiceExt;

    fn state(oracle: StaticOracle) -> ListState {
        ListState {
            pool: lazy_pool(),
            publisher: Arc::new(MemoryPublisher::new()),
            oracle: Arc::new(oracle),
        }
    }

    #[tokio::test]
    async fn test_every_method_has_one_policy() {
        let server = rpc_server(state(StaticOracle::default()));
        assert!(coverage_gaps(&server.methods(), RULES).is_empty());
        assert_eq!(server.methods().len(), METHODS.len());

        let validator = validator();
        assert!(METHODS.iter().all(|m| validator.covers(m)));
    }

    #[tokio::test]
    async fn test_observer_cannot_create_lists() {
        let oracle = StaticOracle::default().with(5, 10, Role::Observer);
        let response = rpc_server(state(oracle))
            .into_router()
            .oneshot(
                Request::post(format!("/rpc/{}", method::CREATE_LIST))
                    .header("content-type", "application/json")
                    .header("userid", "5")
                    .header("boardid", "10")
                    .body(Body::from(r#"{"boardId": 10, "name": "Todo"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_method_is_forbidden() {
        let response = rpc_server(state(StaticOracle::default()))
            .into_router()
            .oneshot(
                Request::post("/rpc/kanban.list.ListService/DropTable")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
