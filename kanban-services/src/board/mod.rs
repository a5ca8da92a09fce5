/// Board service
///
/// Boards, memberships and labels. Deleting a board announces `board.delete`
/// so the list and card services cascade.

pub mod handlers;

use kanban_shared::authz::oracle::RoleOracle;
use kanban_shared::authz::role::Role;
use kanban_shared::authz::subject::NoSubjects;
use kanban_shared::contracts::board::{
    method, AddMembersRequest, AssignRoleRequest, CreateBoardRequest, CreateLabelRequest,
    DeleteLabelRequest, RemoveMembersRequest, TransferOwnershipRequest, UpdateBoardRequest, SERVICE,
};
use kanban_shared::contracts::common::{IdRequest, PageRequest};
use kanban_shared::events::EventPublisher;
use kanban_shared::rpc::authorize::{AuthorizationInterceptor, MethodRule, Subject};
use kanban_shared::rpc::server::RpcServer;
use kanban_shared::rpc::typed::unary;
use kanban_shared::rpc::validate::ShapeValidator;
use sqlx::PgPool;
use std::sync::Arc;

const BOARD: Subject = Subject::Board("id");

pub const RULES: &[MethodRule] = &[
    MethodRule::authenticated(method::CREATE_BOARD),
    MethodRule::authenticated(method::LIST_BOARDS),
    MethodRule::exempt(method::GET_BOARD_BY_ID),
    MethodRule::role(method::UPDATE_BOARD, Role::Admin, BOARD),
    MethodRule::role(method::ARCHIVE_BOARD, Role::Admin, BOARD),
    MethodRule::role(method::RESTORE_BOARD, Role::Admin, BOARD),
    MethodRule::role(method::DELETE_BOARD, Role::Owner, BOARD),
    MethodRule::role(method::ADD_MEMBERS, Role::Admin, BOARD),
    MethodRule::role(method::REMOVE_MEMBERS, Role::Admin, BOARD),
    MethodRule::role(method::ASSIGN_ROLE, Role::Admin, BOARD),
    MethodRule::role(method::TRANSFER_OWNERSHIP, Role::Owner, BOARD),
    MethodRule::role(method::CREATE_LABEL, Role::Member, BOARD),
    MethodRule::role(method::DELETE_LABEL, Role::Admin, BOARD),
];

#[derive(Clone)]
pub struct BoardState {
    pub pool: PgPool,
    pub publisher: Arc<dyn EventPublisher>,
    pub oracle: Arc<dyn RoleOracle>,
}

pub fn validator() -> ShapeValidator {
    ShapeValidator::new()
        .check::<CreateBoardRequest>(method::CREATE_BOARD)
        .check::<PageRequest>(method::LIST_BOARDS)
        .check::<IdRequest>(method::GET_BOARD_BY_ID)
        .check::<UpdateBoardRequest>(method::UPDATE_BOARD)
        .check::<IdRequest>(method::ARCHIVE_BOARD)
        .check::<IdRequest>(method::RESTORE_BOARD)
        .check::<IdRequest>(method::DELETE_BOARD)
        .check::<AddMembersRequest>(method::ADD_MEMBERS)
        .check::<RemoveMembersRequest>(method::REMOVE_MEMBERS)
        .check::<AssignRoleRequest>(method::ASSIGN_ROLE)
        .check::<TransferOwnershipRequest>(method::TRANSFER_OWNERSHIP)
        .check::<CreateLabelRequest>(method::CREATE_LABEL)
        .check::<DeleteLabelRequest>(method::DELETE_LABEL)
}

pub fn rpc_server(state: BoardState) -> RpcServer {
    let authz = AuthorizationInterceptor::new(RULES, state.oracle.clone(), Arc::new(NoSubjects));

    RpcServer::new(SERVICE)
        .interceptor(validator())
        .interceptor(authz)
        .method(method::CREATE_BOARD, unary(state.clone(), handlers::create_board))
        .method(method::LIST_BOARDS, unary(state.clone(), handlers::list_boards))
        .method(method::GET_BOARD_BY_ID, unary(state.clone(), handlers::get_board_by_id))
        .method(method::UPDATE_BOARD, unary(state.clone(), handlers::update_board))
        .method(method::ARCHIVE_BOARD, unary(state.clone(), handlers::archive_board))
        .method(method::RESTORE_BOARD, unary(state.clone(), handlers::restore_board))
        .method(method::DELETE_BOARD, unary(state.clone(), handlers::delete_board))
        .method(method::ADD_MEMBERS, unary(state.clone(), handlers::add_members))
        .method(method::REMOVE_MEMBERS, unary(state.clone(), handlers::remove_members))
        .method(method::ASSIGN_ROLE, unary(state.clone(), handlers::assign_role))
        .method(method::TRANSFER_OWNERSHIP, unary(state.clone(), handlers::transfer_ownership))
        .method(method::CREATE_LABEL, unary(state.clone(), handlers::create_label))
        .method(method::DELETE_LABEL, unary(state, handlers::delete_label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::testing::{lazy_pool, StaticOracle};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use kanban_shared::contracts::board::METHODS;
    use kanban_shared::error::Status;
    use kanban_shared::events::memory::MemoryPublisher;
    use kanban_shared::rpc::authorize::coverage_gaps;
    use tower::ServiceExt;

    fn state(oracle: StaticOracle) -> BoardState {
        BoardState {
            pool: lazy_pool(),
            publisher: Arc::new(MemoryPublisher::new()),
            oracle: Arc::new(oracle),
        }
    }

    async fn call(state: BoardState, method: &str, headers: &[(&str, &str)], body: &str) -> (StatusCode, Status) {
        let mut request = Request::post(format!("/rpc/{}", method)).header("content-type", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = rpc_server(state)
            .into_router()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_every_method_has_one_policy() {
        let server = rpc_server(state(StaticOracle::default()));
        assert!(coverage_gaps(&server.methods(), RULES).is_empty());
        assert_eq!(server.methods().len(), METHODS.len());
    }

    #[tokio::test]
    async fn test_missing_metadata_lists_both_keys() {
        let (status, body) = call(
            state(StaticOracle::default()),
            method::ARCHIVE_BOARD,
            &[],
            r#"{"id": 10}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields: Vec<&str> = body.details.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["userid", "boardid"]);
    }

    #[tokio::test]
    async fn test_member_cannot_rename_board() {
        let oracle = StaticOracle::default().with(2, 10, Role::Member);
        let (status, _) = call(
            state(oracle),
            method::UPDATE_BOARD,
            &[("userid", "2"), ("boardid", "10")],
            r#"{"id": 10, "name": "Renamed"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_body_board_must_match_metadata_board() {
        let oracle = StaticOracle::default().with(1, 10, Role::Owner);
        let (status, _) = call(
            state(oracle),
            method::ARCHIVE_BOARD,
            &[("userid", "1"), ("boardid", "10")],
            r#"{"id": 11}"#,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_cannot_grant_admin() {
        let oracle = StaticOracle::default().with(3, 10, Role::Admin);
        let (status, body) = call(
            state(oracle),
            method::ADD_MEMBERS,
            &[("userid", "3"), ("boardid", "10")],
            r#"{"id": 10, "userIds": [4], "role": "admin"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.message.contains("admin"));
    }

    #[tokio::test]
    async fn test_hidden_board_is_not_found() {
        let (status, _) = call(
            state(StaticOracle::default()),
            method::GET_BOARD_BY_ID,
            &[("userid", "9")],
            r#"{"id": 10}"#,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
