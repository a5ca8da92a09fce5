/// Route handlers, one module per resource
///
/// - `health`: liveness and backend readiness
/// - `users`: registration and email change
/// - `auth`: login and token refresh
/// - `boards`, `lists`, `cards`: proxies to the entity services
///
/// List and card routes carry the board scope as the `boardId` query
/// parameter; board routes take it from the path.

pub mod auth;
pub mod boards;
pub mod cards;
pub mod health;
pub mod lists;
pub mod users;

use crate::error::ApiError;
use serde::Deserialize;

/// `?boardId=` on list and card routes
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardScope {
    pub board_id: Option<i64>,
}

impl BoardScope {
    /// The board id, required on every mutating route
    pub fn required(&self) -> Result<i64, ApiError> {
        self.board_id
            .ok_or_else(|| ApiError::invalid("boardId", "boardId query parameter is required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_scope_required() {
        let scope: BoardScope = serde_json::from_str(r#"{"boardId": 4}"#).unwrap();
        assert_eq!(scope.required().unwrap(), 4);

        match BoardScope::default().required() {
            Err(ApiError::Validation(details)) => assert_eq!(details[0].field, "boardId"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
