/// Board role oracle
///
/// Answers two questions about a `(user, board)` pair:
///
/// - `CheckBoardUserRole`: is the caller's role at least the required one?
/// - `CheckBoardVisibility`: may the caller read the board at all?
///
/// The identity service answers from the database ([`PgRoleOracle`]); every
/// other service asks the identity service over RPC through the same trait.

use super::role::Role;
use crate::error::StatusResult;
use crate::models::board::Visibility;
use crate::rpc::metadata::Metadata;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Outcome of a role check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum RoleCheck {
    /// Caller holds `role`, which satisfies the requirement
    Ok { role: Role },

    /// Caller is a member but the role is too low
    Denied { reason: String },

    /// No membership row for the pair
    NotFound,
}

/// Outcome of a visibility check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum VisibilityCheck {
    Ok,
    Denied { reason: String },
}

#[async_trait]
pub trait RoleOracle: Send + Sync + 'static {
    async fn check_board_user_role(
        &self,
        metadata: &Metadata,
        user_id: i64,
        board_id: i64,
        required: Role,
    ) -> StatusResult<RoleCheck>;

    async fn check_board_visibility(
        &self,
        metadata: &Metadata,
        user_id: Option<i64>,
        board_id: i64,
    ) -> StatusResult<VisibilityCheck>;
}

/// Role decision from the stored membership
pub fn decide_role(membership: Option<Role>, required: Role) -> RoleCheck {
    match membership {
        None => RoleCheck::NotFound,
        Some(role) if role.has_permission(required) => RoleCheck::Ok { role },
        Some(role) => RoleCheck::Denied {
            reason: format!("role {} is below required {}", role, required),
        },
    }
}

/// Visibility decision; `board` is `None` when the board is missing or deleted
pub fn decide_visibility(board: Option<(Visibility, bool)>) -> VisibilityCheck {
    match board {
        None => VisibilityCheck::Denied {
            reason: "board not found".to_string(),
        },
        Some((visibility, is_member)) if visibility.is_open() || is_member => VisibilityCheck::Ok,
        Some(_) => VisibilityCheck::Denied {
            reason: "board is private".to_string(),
        },
    }
}

/// Database-backed oracle used inside the identity service
#[derive(Clone)]
pub struct PgRoleOracle {
    pool: PgPool,
}

impl PgRoleOracle {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleOracle for PgRoleOracle {
    async fn check_board_user_role(
        &self,
        _metadata: &Metadata,
        user_id: i64,
        board_id: i64,
        required: Role,
    ) -> StatusResult<RoleCheck> {
        let membership = crate::models::board_member::BoardMember::find_role(
            &self.pool, board_id, user_id,
        )
        .await?;
        Ok(decide_role(membership, required))
    }

    async fn check_board_visibility(
        &self,
        _metadata: &Metadata,
        user_id: Option<i64>,
        board_id: i64,
    ) -> StatusResult<VisibilityCheck> {
        // one read: board joined with the caller's membership
        let row: Option<(Visibility, bool)> = sqlx::query_as(
            r#"
            SELECT b.visibility, (m.user_id IS NOT NULL) AS is_member
            FROM boards b
            LEFT JOIN board_members m ON m.board_id = b.id AND m.user_id = $2
            WHERE b.id = $1 AND b.deleted_at IS NULL
            "#,
        )
        .bind(board_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(decide_visibility(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_role() {
        assert_eq!(decide_role(None, Role::Observer), RoleCheck::NotFound);
        assert_eq!(
            decide_role(Some(Role::Admin), Role::Member),
            RoleCheck::Ok { role: Role::Admin }
        );
        assert_eq!(
            decide_role(Some(Role::Member), Role::Member),
            RoleCheck::Ok { role: Role::Member }
        );
        assert!(matches!(
            decide_role(Some(Role::Observer), Role::Member),
            RoleCheck::Denied { .. }
        ));
    }

    #[test]
    fn test_decide_visibility() {
        assert!(matches!(decide_visibility(None), VisibilityCheck::Denied { .. }));
        assert_eq!(decide_visibility(Some((Visibility::Public, false))), VisibilityCheck::Ok);
        assert_eq!(decide_visibility(Some((Visibility::Private, true))), VisibilityCheck::Ok);
        assert!(matches!(
            decide_visibility(Some((Visibility::Private, false))),
            VisibilityCheck::Denied { .. }
        ));
        assert!(matches!(
            decide_visibility(Some((Visibility::Team, false))),
            VisibilityCheck::Denied { .. }
        ));
    }

    #[test]
    fn test_role_check_wire_format() {
        let json = serde_json::to_value(RoleCheck::Ok { role: Role::Owner }).unwrap();
        assert_eq!(json["result"], "ok");
        assert_eq!(json["role"], "owner");

        let back: RoleCheck = serde_json::from_value(serde_json::json!({"result": "notFound"})).unwrap();
        assert_eq!(back, RoleCheck::NotFound);
    }
}
