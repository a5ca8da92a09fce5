/// Helpers shared by the service handlers

use kanban_shared::authz::oracle::{RoleOracle, VisibilityCheck};
use kanban_shared::contracts::common::IdRequest;
use kanban_shared::error::{FieldViolation, Status, StatusResult};
use kanban_shared::events::{publish_event, EventPublisher};
use kanban_shared::rpc::RequestContext;
use serde::Serialize;

/// Publishes a committed mutation within the request's remaining budget
///
/// A broker failure surfaces as `unavailable`; the database change stays
/// committed and a retry of the same request republishes.
pub async fn publish<T>(
    ctx: &RequestContext,
    publisher: &dyn EventPublisher,
    routing_key: &str,
    message: &T,
) -> StatusResult<()>
where
    T: Serialize + Sync + ?Sized,
{
    ctx.bounded(async {
        publish_event(publisher, routing_key, message)
            .await
            .map_err(Status::from)
    })
    .await
    .map_err(|status| {
        tracing::warn!(
            routing_key = %routing_key,
            request_id = %ctx.request_id,
            error = %status,
            "Event publish failed"
        );
        status
    })
}

/// Read gate for exempt methods
///
/// A board the caller may not see is reported as missing.
pub async fn ensure_visible(
    oracle: &dyn RoleOracle,
    ctx: &RequestContext,
    board_id: i64,
) -> StatusResult<()> {
    let md = ctx.outgoing();
    let check = ctx
        .bounded(oracle.check_board_visibility(&md, ctx.user_id, board_id))
        .await?;

    match check {
        VisibilityCheck::Ok => Ok(()),
        VisibilityCheck::Denied { reason } => {
            tracing::debug!(board_id, reason = %reason, "Board hidden from caller");
            Err(Status::not_found("board not found"))
        }
    }
}

/// Entity id carried by a `*.delete` event
pub fn event_id(payload: &[u8]) -> StatusResult<i64> {
    serde_json::from_slice::<IdRequest>(payload)
        .map(|msg| msg.id)
        .map_err(|e| Status::validation(vec![FieldViolation::new("payload", "malformed", e.to_string())]))
}

/// Sorted, deduplicated copy of a caller-supplied id list
pub fn unique_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}
