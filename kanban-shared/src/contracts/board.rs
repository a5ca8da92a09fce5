/// Board service contract

use super::common::{Empty, IdRequest, PageRequest, Pagination};
use crate::authz::role::Role;
use crate::error::StatusResult;
use crate::models::board::{Board, Visibility};
use crate::models::board_member::{BoardMember, MemberView};
use crate::models::label::Label;
use crate::rpc::client::RpcClient;
use crate::rpc::metadata::Metadata;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const SERVICE: &str = "kanban.board.BoardService";

pub mod method {
    pub const CREATE_BOARD: &str = "kanban.board.BoardService/CreateBoard";
    pub const LIST_BOARDS: &str = "kanban.board.BoardService/ListBoards";
    pub const GET_BOARD_BY_ID: &str = "kanban.board.BoardService/GetBoardById";
    pub const UPDATE_BOARD: &str = "kanban.board.BoardService/UpdateBoard";
    pub const ARCHIVE_BOARD: &str = "kanban.board.BoardService/ArchiveBoard";
    pub const RESTORE_BOARD: &str = "kanban.board.BoardService/RestoreBoard";
    pub const DELETE_BOARD: &str = "kanban.board.BoardService/DeleteBoard";
    pub const ADD_MEMBERS: &str = "kanban.board.BoardService/AddMembers";
    pub const REMOVE_MEMBERS: &str = "kanban.board.BoardService/RemoveMembers";
    pub const ASSIGN_ROLE: &str = "kanban.board.BoardService/AssignRole";
    pub const TRANSFER_OWNERSHIP: &str = "kanban.board.BoardService/TransferOwnership";
    pub const CREATE_LABEL: &str = "kanban.board.BoardService/CreateLabel";
    pub const DELETE_LABEL: &str = "kanban.board.BoardService/DeleteLabel";
}

pub const METHODS: &[&str] = &[
    method::CREATE_BOARD,
    method::LIST_BOARDS,
    method::GET_BOARD_BY_ID,
    method::UPDATE_BOARD,
    method::ARCHIVE_BOARD,
    method::RESTORE_BOARD,
    method::DELETE_BOARD,
    method::ADD_MEMBERS,
    method::REMOVE_MEMBERS,
    method::ASSIGN_ROLE,
    method::TRANSFER_OWNERSHIP,
    method::CREATE_LABEL,
    method::DELETE_LABEL,
];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBoardRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,

    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListBoardsResponse {
    pub boards: Vec<Board>,
    pub pagination: Pagination,
}

/// Board with its members and labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,
    pub members: Vec<MemberView>,
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateBoardRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: Option<String>,

    #[serde(default)]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    #[validate(
        length(min = 1, max = 100, message = "userIds must hold 1-100 ids"),
        custom(function = "positive_ids")
    )]
    pub user_ids: Vec<i64>,

    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddMembersResponse {
    /// Users that became members
    pub added: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMembersRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    #[validate(
        length(min = 1, max = 100, message = "userIds must hold 1-100 ids"),
        custom(function = "positive_ids")
    )]
    pub user_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveMembersResponse {
    pub removed: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    #[validate(range(min = 1, message = "userId must be positive"))]
    pub user_id: i64,

    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransferOwnershipRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    #[validate(range(min = 1, message = "newOwnerId must be positive"))]
    pub new_owner_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateLabelRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    #[validate(length(min = 1, max = 64, message = "name must be 1-64 characters"))]
    pub name: String,

    #[validate(custom(function = "hex_color"))]
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLabelRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    #[validate(range(min = 1, message = "labelId must be positive"))]
    pub label_id: i64,
}

fn positive_ids(ids: &[i64]) -> Result<(), ValidationError> {
    if ids.iter().all(|id| *id > 0) {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("every id must be positive".into());
        Err(err)
    }
}

/// `#rrggbb`
fn hex_color(color: &str) -> Result<(), ValidationError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("format");
        err.message = Some("color must look like #rrggbb".into());
        Err(err)
    }
}

#[derive(Debug, Clone)]
pub struct BoardClient {
    rpc: RpcClient,
}

impl BoardClient {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub async fn create_board(&self, md: &Metadata, req: &CreateBoardRequest) -> StatusResult<Board> {
        self.rpc.call(method::CREATE_BOARD, md, req).await
    }

    pub async fn list_boards(&self, md: &Metadata, req: &PageRequest) -> StatusResult<ListBoardsResponse> {
        self.rpc.call(method::LIST_BOARDS, md, req).await
    }

    pub async fn get_board_by_id(&self, md: &Metadata, req: &IdRequest) -> StatusResult<BoardDetail> {
        self.rpc.call(method::GET_BOARD_BY_ID, md, req).await
    }

    pub async fn update_board(&self, md: &Metadata, req: &UpdateBoardRequest) -> StatusResult<Board> {
        self.rpc.call(method::UPDATE_BOARD, md, req).await
    }

    pub async fn archive_board(&self, md: &Metadata, req: &IdRequest) -> StatusResult<Board> {
        self.rpc.call(method::ARCHIVE_BOARD, md, req).await
    }

    pub async fn restore_board(&self, md: &Metadata, req: &IdRequest) -> StatusResult<Board> {
        self.rpc.call(method::RESTORE_BOARD, md, req).await
    }

    pub async fn delete_board(&self, md: &Metadata, req: &IdRequest) -> StatusResult<Empty> {
        self.rpc.call(method::DELETE_BOARD, md, req).await
    }

    pub async fn add_members(&self, md: &Metadata, req: &AddMembersRequest) -> StatusResult<AddMembersResponse> {
        self.rpc.call(method::ADD_MEMBERS, md, req).await
    }

    pub async fn remove_members(&self, md: &Metadata, req: &RemoveMembersRequest) -> StatusResult<RemoveMembersResponse> {
        self.rpc.call(method::REMOVE_MEMBERS, md, req).await
    }

    pub async fn assign_role(&self, md: &Metadata, req: &AssignRoleRequest) -> StatusResult<BoardMember> {
        self.rpc.call(method::ASSIGN_ROLE, md, req).await
    }

    pub async fn transfer_ownership(&self, md: &Metadata, req: &TransferOwnershipRequest) -> StatusResult<Empty> {
        self.rpc.call(method::TRANSFER_OWNERSHIP, md, req).await
    }

    pub async fn create_label(&self, md: &Metadata, req: &CreateLabelRequest) -> StatusResult<Label> {
        self.rpc.call(method::CREATE_LABEL, md, req).await
    }

    pub async fn delete_label(&self, md: &Metadata, req: &DeleteLabelRequest) -> StatusResult<Empty> {
        self.rpc.call(method::DELETE_LABEL, md, req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_members_validation() {
        let req: AddMembersRequest =
            serde_json::from_value(json!({"id": 1, "userIds": [], "role": "member"})).unwrap();
        assert!(req.validate().is_err());

        let req: AddMembersRequest =
            serde_json::from_value(json!({"id": 1, "userIds": [2, -3], "role": "member"})).unwrap();
        assert!(req.validate().is_err());

        let req: AddMembersRequest =
            serde_json::from_value(json!({"id": 1, "userIds": [2, 3], "role": "observer"})).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_unknown_role_is_rejected_at_decode() {
        let parsed = serde_json::from_value::<AssignRoleRequest>(
            json!({"id": 1, "userId": 2, "role": "superuser"}),
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_hex_color() {
        assert!(hex_color("#a1B2c3").is_ok());
        assert!(hex_color("a1b2c3").is_err());
        assert!(hex_color("#12345").is_err());
        assert!(hex_color("#gggggg").is_err());
    }

    #[test]
    fn test_create_board_defaults_to_private() {
        let req: CreateBoardRequest = serde_json::from_value(json!({"name": "B1"})).unwrap();
        assert_eq!(req.visibility, Visibility::Private);
    }
}
