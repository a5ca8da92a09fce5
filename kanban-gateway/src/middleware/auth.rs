/// Bearer authentication and per-request RPC metadata
///
/// [`require_bearer`] resolves `Authorization: Bearer <token>` through the
/// identity service and stores the caller in the request extensions.
/// Handlers then take a [`CallContext`], which carries the metadata every
/// internal call is made with: caller id, correlation id and deadline.

use crate::app::AppState;
use crate::error::ApiError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use kanban_shared::contracts::identity::AuthenticateRequest;
use kanban_shared::rpc::metadata::{Metadata, REQUEST_ID};
use uuid::Uuid;

/// Authenticated caller, inserted by [`require_bearer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
}

/// JWT bearer middleware for every non-public route
pub async fn require_bearer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?.to_string();

    let identity = state.clients.identity().await?;
    let md = Metadata::new()
        .with_request_id(request_id(req.headers()))
        .with_timeout(state.config.rpc_timeout);
    let resolved = identity
        .authenticate(&md, &AuthenticateRequest { token })
        .await?;

    tracing::debug!(user_id = resolved.user_id, "Caller authenticated");
    req.extensions_mut().insert(Caller {
        user_id: resolved.user_id,
    });

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))
}

/// Incoming correlation id, or a fresh one
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Metadata for the internal calls made while serving one request
#[derive(Debug, Clone)]
pub struct CallContext {
    pub caller: Option<Caller>,
    pub metadata: Metadata,
}

impl CallContext {
    /// The authenticated caller; only absent on public routes
    pub fn caller(&self) -> Result<Caller, ApiError> {
        self.caller
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }

    /// Metadata scoped to `board_id`
    pub fn on_board(&self, board_id: i64) -> Metadata {
        self.metadata.clone().with_board(board_id)
    }

    /// Metadata scoped to `board_id` when the request named one
    pub fn on_optional_board(&self, board_id: Option<i64>) -> Metadata {
        match board_id {
            Some(id) => self.on_board(id),
            None => self.metadata.clone(),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CallContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let caller = parts.extensions.get::<Caller>().copied();

        let mut metadata = Metadata::new()
            .with_request_id(request_id(&parts.headers))
            .with_timeout(state.config.rpc_timeout);
        if let Some(caller) = caller {
            metadata = metadata.with_user(caller.user_id);
        }

        Ok(Self { caller, metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(ApiError::Unauthorized(_))));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(bearer_token(&headers), Err(ApiError::Unauthorized(_))));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }

    #[test]
    fn test_request_id_is_propagated_or_generated() {
        let mut headers = HeaderMap::new();
        let generated = request_id(&headers);
        assert!(Uuid::parse_str(&generated).is_ok());

        headers.insert(REQUEST_ID, HeaderValue::from_static("req-42"));
        assert_eq!(request_id(&headers), "req-42");
    }

    #[test]
    fn test_board_scope() {
        let ctx = CallContext {
            caller: Some(Caller { user_id: 7 }),
            metadata: Metadata::new().with_user(7),
        };

        assert_eq!(ctx.on_board(3).board_id.as_deref(), Some("3"));
        assert_eq!(ctx.on_optional_board(None).board_id, None);
        assert_eq!(ctx.caller().unwrap().user_id, 7);
    }
}
