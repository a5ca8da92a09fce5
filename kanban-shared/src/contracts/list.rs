/// List service contract

use super::common::{Empty, IdRequest};
use crate::error::StatusResult;
use crate::models::list::List;
use crate::rpc::client::RpcClient;
use crate::rpc::metadata::Metadata;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const SERVICE: &str = "kanban.list.ListService";

pub mod method {
    pub const CREATE_LIST: &str = "kanban.list.ListService/CreateList";
    pub const GET_LIST_BY_ID: &str = "kanban.list.ListService/GetListById";
    pub const GET_LISTS_BY_BOARD: &str = "kanban.list.ListService/GetListsByBoard";
    pub const UPDATE_LIST: &str = "kanban.list.ListService/UpdateList";
    pub const MOVE_LIST: &str = "kanban.list.ListService/MoveList";
    pub const ARCHIVE_LIST: &str = "kanban.list.ListService/ArchiveList";
    pub const RESTORE_LIST: &str = "kanban.list.ListService/RestoreList";
    pub const DELETE_LIST: &str = "kanban.list.ListService/DeleteList";
}

pub const METHODS: &[&str] = &[
    method::CREATE_LIST,
    method::GET_LIST_BY_ID,
    method::GET_LISTS_BY_BOARD,
    method::UPDATE_LIST,
    method::MOVE_LIST,
    method::ARCHIVE_LIST,
    method::RESTORE_LIST,
    method::DELETE_LIST,
];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateListRequest {
    #[validate(range(min = 1, message = "boardId must be positive"))]
    pub board_id: i64,

    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetListsByBoardRequest {
    #[validate(range(min = 1, message = "boardId must be positive"))]
    pub board_id: i64,

    #[serde(default)]
    pub include_archived: bool,
}

/// Lists of one board in position order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListsResponse {
    pub lists: Vec<List>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateListRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MoveListRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    /// 1-based; values past the end land last
    #[validate(range(min = 1, message = "newPosition must be at least 1"))]
    pub new_position: i64,
}

#[derive(Debug, Clone)]
pub struct ListClient {
    rpc: RpcClient,
}

impl ListClient {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub async fn create_list(&self, md: &Metadata, req: &CreateListRequest) -> StatusResult<List> {
        self.rpc.call(method::CREATE_LIST, md, req).await
    }

    pub async fn get_list_by_id(&self, md: &Metadata, req: &IdRequest) -> StatusResult<List> {
        self.rpc.call(method::GET_LIST_BY_ID, md, req).await
    }

    pub async fn get_lists_by_board(&self, md: &Metadata, req: &GetListsByBoardRequest) -> StatusResult<ListsResponse> {
        self.rpc.call(method::GET_LISTS_BY_BOARD, md, req).await
    }

    pub async fn update_list(&self, md: &Metadata, req: &UpdateListRequest) -> StatusResult<List> {
        self.rpc.call(method::UPDATE_LIST, md, req).await
    }

    pub async fn move_list(&self, md: &Metadata, req: &MoveListRequest) -> StatusResult<ListsResponse> {
        self.rpc.call(method::MOVE_LIST, md, req).await
    }

    pub async fn archive_list(&self, md: &Metadata, req: &IdRequest) -> StatusResult<List> {
        self.rpc.call(method::ARCHIVE_LIST, md, req).await
    }

    pub async fn restore_list(&self, md: &Metadata, req: &IdRequest) -> StatusResult<List> {
        self.rpc.call(method::RESTORE_LIST, md, req).await
    }

    pub async fn delete_list(&self, md: &Metadata, req: &IdRequest) -> StatusResult<Empty> {
        self.rpc.call(method::DELETE_LIST, md, req).await
    }
}
