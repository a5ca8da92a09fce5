/// Request-scoped context filled in by the interceptor chain

use super::metadata::Metadata;
use crate::authz::role::Role;
use crate::error::{Status, StatusResult};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,

    /// Caller identity, set by authorization
    pub user_id: Option<i64>,

    /// Board scope, set by authorization (resolved from the subject when the
    /// method names a list or card)
    pub board_id: Option<i64>,

    /// Caller's role on `board_id` when a role check ran
    pub role: Option<Role>,

    pub deadline: Instant,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, deadline: Instant) -> Self {
        Self {
            request_id: request_id.into(),
            user_id: None,
            board_id: None,
            role: None,
            deadline,
        }
    }

    /// Authenticated caller
    pub fn caller(&self) -> StatusResult<i64> {
        self.user_id
            .ok_or_else(|| Status::unauthenticated("missing caller identity"))
    }

    pub fn board(&self) -> StatusResult<i64> {
        self.board_id
            .ok_or_else(|| Status::forbidden("request has no board scope"))
    }

    pub fn role(&self) -> StatusResult<Role> {
        self.role
            .ok_or_else(|| Status::forbidden("caller role was not established"))
    }

    /// Time left before the deadline
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Metadata for a downstream call made on behalf of this request
    pub fn outgoing(&self) -> Metadata {
        let mut md = Metadata::new()
            .with_request_id(self.request_id.clone())
            .with_timeout(self.remaining());
        if let Some(user) = self.user_id {
            md = md.with_user(user);
        }
        if let Some(board) = self.board_id {
            md = md.with_board(board);
        }
        md
    }

    /// Runs `fut` bounded by the remaining budget
    pub async fn bounded<T, F>(&self, fut: F) -> StatusResult<T>
    where
        F: std::future::Future<Output = StatusResult<T>>,
    {
        match tokio::time::timeout(self.remaining(), fut).await {
            Ok(result) => result,
            Err(_) => Err(Status::unavailable("deadline exceeded")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outgoing_carries_identity_and_budget() {
        let mut ctx = RequestContext::new("req-1", Instant::now() + Duration::from_secs(2));
        ctx.user_id = Some(5);
        ctx.board_id = Some(9);

        let md = ctx.outgoing();
        assert_eq!(md.user_id.as_deref(), Some("5"));
        assert_eq!(md.board_id.as_deref(), Some("9"));
        assert_eq!(md.request_id.as_deref(), Some("req-1"));
        assert!(md.deadline_ms.unwrap() <= 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let ctx = RequestContext::new("req-2", Instant::now() + Duration::from_millis(50));
        let result: StatusResult<()> = ctx
            .bounded(async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            })
            .await;

        assert_eq!(result.unwrap_err().code, crate::error::Code::Unavailable);
    }

    #[test]
    fn test_missing_caller_is_unauthenticated() {
        let ctx = RequestContext::new("req-3", Instant::now());
        assert_eq!(ctx.caller().unwrap_err().code, crate::error::Code::Unauthenticated);
    }
}
