/// Card service
///
/// Cards, their ordering within lists, label links, comments and attachment
/// metadata. Consumes `board.*`, `list.*` and `card.*` for cascades.

pub mod consumer;
pub mod handlers;

use kanban_shared::authz::oracle::RoleOracle;
use kanban_shared::authz::role::Role;
use kanban_shared::authz::subject::PgSubjectResolver;
use kanban_shared::contracts::card::{
    method, CardLabelRequest, CreateAttachmentRequest, CreateCardRequest, CreateCommentRequest,
    DeleteAttachmentRequest, DeleteCommentRequest, GetCardsByListRequest, MoveCardRequest,
    UpdateCardRequest, SERVICE,
};
use kanban_shared::contracts::common::IdRequest;
use kanban_shared::events::EventPublisher;
use kanban_shared::rpc::authorize::{AuthorizationInterceptor, MethodRule, Subject};
use kanban_shared::rpc::server::RpcServer;
use kanban_shared::rpc::typed::unary;
use kanban_shared::rpc::validate::ShapeValidator;
use sqlx::PgPool;
use std::sync::Arc;

const CARD: Subject = Subject::Card("id");

pub const RULES: &[MethodRule] = &[
    MethodRule::role(method::CREATE_CARD, Role::Member, Subject::List("listId")),
    MethodRule::exempt(method::GET_CARD_BY_ID),
    MethodRule::exempt(method::GET_CARDS_BY_LIST),
    MethodRule::role(method::UPDATE_CARD, Role::Member, CARD),
    MethodRule::role(method::MOVE_CARD, Role::Member, CARD),
    MethodRule::role(method::ARCHIVE_CARD, Role::Member, CARD),
    MethodRule::role(method::RESTORE_CARD, Role::Member, CARD),
    MethodRule::role(method::DELETE_CARD, Role::Member, CARD),
    MethodRule::role(method::ADD_CARD_LABEL, Role::Member, CARD),
    MethodRule::role(method::REMOVE_CARD_LABEL, Role::Member, CARD),
    MethodRule::role(method::CREATE_COMMENT, Role::Observer, CARD),
    MethodRule::role(method::DELETE_COMMENT, Role::Observer, CARD),
    MethodRule::role(method::CREATE_ATTACHMENT, Role::Member, CARD),
    MethodRule::role(method::DELETE_ATTACHMENT, Role::Member, CARD),
];

#[derive(Clone)]
pub struct CardState {
    pub pool: PgPool,
    pub publisher: Arc<dyn EventPublisher>,
    pub oracle: Arc<dyn RoleOracle>,
}

pub fn validator() -> ShapeValidator {
    ShapeValidator::new()
        .check::<CreateCardRequest>(method::CREATE_CARD)
        .check::<IdRequest>(method::GET_CARD_BY_ID)
        .check::<GetCardsByListRequest>(method::GET_CARDS_BY_LIST)
        .check::<UpdateCardRequest>(method::UPDATE_CARD)
        .check::<MoveCardRequest>(method::MOVE_CARD)
        .check::<IdRequest>(method::ARCHIVE_CARD)
        .check::<IdRequest>(method::RESTORE_CARD)
        .check::<IdRequest>(method::DELETE_CARD)
        .check::<CardLabelRequest>(method::ADD_CARD_LABEL)
        .check::<CardLabelRequest>(method::REMOVE_CARD_LABEL)
        .check::<CreateCommentRequest>(method::CREATE_COMMENT)
        .check::<DeleteCommentRequest>(method::DELETE_COMMENT)
        .check::<CreateAttachmentRequest>(method::CREATE_ATTACHMENT)
        .check::<DeleteAttachmentRequest>(method::DELETE_ATTACHMENT)
}

pub fn rpc_server(state: CardState) -> RpcServer {
    let resolver = Arc::new(PgSubjectResolver::new(state.pool.clone()));
    let authz = AuthorizationInterceptor::new(RULES, state.oracle.clone(), resolver);

    RpcServer::new(SERVICE)
        .interceptor(validator())
        .interceptor(authz)
        .method(method::CREATE_CARD, unary(state.clone(), handlers::create_card))
        .method(method::GET_CARD_BY_ID, unary(state.clone(), handlers::get_card_by_id))
        .method(method::GET_CARDS_BY_LIST, unary(state.clone(), handlers::get_cards_by_list))
        .method(method::UPDATE_CARD, unary(state.clone(), handlers::update_card))
        .method(method::MOVE_CARD, unary(state.clone(), handlers::move_card))
        .method(method::ARCHIVE_CARD, unary(state.clone(), handlers::archive_card))
        .method(method::RESTORE_CARD, unary(state.clone(), handlers::restore_card))
        .method(method::DELETE_CARD, unary(state.clone(), handlers::delete_card))
        .method(method::ADD_CARD_LABEL, unary(state.clone(), handlers::add_card_label))
        .method(method::REMOVE_CARD_LABEL, unary(state.clone(), handlers::remove_card_label))
        .method(method::CREATE_COMMENT, unary(state.clone(), handlers::create_comment))
        .method(method::DELETE_COMMENT, unary(state.clone(), handlers::delete_comment))
        .method(method::CREATE_ATTACHMENT, unary(state.clone(), handlers::create_attachment))
        .method(method::DELETE_ATTACHMENT, unary(state, handlers::delete_attachment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::testing::{lazy_pool, StaticOracle};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use kanban_shared::contracts::card::METHODS;
    use kanban_shared::error::Status;
    use kanban_shared::events::memory::MemoryPublisher;
    use kanban_shared::rpc::authorize::coverage_gaps;
    use tower::ServiceExt;

    fn state() -> CardState {
        CardState {
            pool: lazy_pool(),
            publisher: Arc::new(MemoryPublisher::new()),
            oracle: Arc::new(StaticOracle::default().with(1, 10, Role::Member)),
        }
    }

    #[tokio::test]
    async fn test_every_method_has_one_policy() {
        let server = rpc_server(state());
        assert!(coverage_gaps(&server.methods(), RULES).is_empty());
        assert_eq!(server.methods().len(), METHODS.len());

        let validator = validator();
        assert!(METHODS.iter().all(|m| validator.covers(m)));
    }

    #[tokio::test]
    async fn test_invalid_move_is_rejected_before_authorization() {
        let response = rpc_server(state())
            .into_router()
            .oneshot(
                Request::post(format!("/rpc/{}", method::MOVE_CARD))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"id": 0, "newPosition": 0}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let status: Status = serde_json::from_slice(&bytes).unwrap();
        let fields: Vec<&str> = status.details.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["id", "new_position"]);
    }

    #[tokio::test]
    async fn test_card_mutation_requires_metadata() {
        let response = rpc_server(state())
            .into_router()
            .oneshot(
                Request::post(format!("/rpc/{}", method::ARCHIVE_CARD))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"id": 3}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
