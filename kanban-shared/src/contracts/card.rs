/// Card service contract
///
/// Cards, their labels, comments and attachment metadata.

use super::common::{Empty, IdRequest};
use crate::error::StatusResult;
use crate::models::attachment::Attachment;
use crate::models::card::Card;
use crate::models::comment::Comment;
use crate::models::label::Label;
use crate::rpc::client::RpcClient;
use crate::rpc::metadata::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const SERVICE: &str = "kanban.card.CardService";

pub mod method {
    pub const CREATE_CARD: &str = "kanban.card.CardService/CreateCard";
    pub const GET_CARD_BY_ID: &str = "kanban.card.CardService/GetCardById";
    pub const GET_CARDS_BY_LIST: &str = "kanban.card.CardService/GetCardsByList";
    pub const UPDATE_CARD: &str = "kanban.card.CardService/UpdateCard";
    pub const MOVE_CARD: &str = "kanban.card.CardService/MoveCard";
    pub const ARCHIVE_CARD: &str = "kanban.card.CardService/ArchiveCard";
    pub const RESTORE_CARD: &str = "kanban.card.CardService/RestoreCard";
    pub const DELETE_CARD: &str = "kanban.card.CardService/DeleteCard";
    pub const ADD_CARD_LABEL: &str = "kanban.card.CardService/AddCardLabel";
    pub const REMOVE_CARD_LABEL: &str = "kanban.card.CardService/RemoveCardLabel";
    pub const CREATE_COMMENT: &str = "kanban.card.CardService/CreateComment";
    pub const DELETE_COMMENT: &str = "kanban.card.CardService/DeleteComment";
    pub const CREATE_ATTACHMENT: &str = "kanban.card.CardService/CreateAttachment";
    pub const DELETE_ATTACHMENT: &str = "kanban.card.CardService/DeleteAttachment";
}

pub const METHODS: &[&str] = &[
    method::CREATE_CARD,
    method::GET_CARD_BY_ID,
    method::GET_CARDS_BY_LIST,
    method::UPDATE_CARD,
    method::MOVE_CARD,
    method::ARCHIVE_CARD,
    method::RESTORE_CARD,
    method::DELETE_CARD,
    method::ADD_CARD_LABEL,
    method::REMOVE_CARD_LABEL,
    method::CREATE_COMMENT,
    method::DELETE_COMMENT,
    method::CREATE_ATTACHMENT,
    method::DELETE_ATTACHMENT,
];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    #[validate(range(min = 1, message = "listId must be positive"))]
    pub list_id: i64,

    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 10000, message = "description is too long"))]
    pub description: Option<String>,

    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub completed: bool,
}

/// Card with its labels, attachments and comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDetail {
    #[serde(flatten)]
    pub card: Card,
    pub labels: Vec<Label>,
    pub attachments: Vec<Attachment>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetCardsByListRequest {
    #[validate(range(min = 1, message = "listId must be positive"))]
    pub list_id: i64,

    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardsResponse {
    pub cards: Vec<Card>,
}

/// Partial update; absent fields keep their value
///
/// Dates cannot be unset through an absent field, so `clearStartDate` and
/// `clearDueDate` exist for that.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardRequest {
    /// Taken from the path at the HTTP edge
    #[serde(default)]
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: Option<String>,

    #[serde(default)]
    #[validate(length(max = 10000, message = "description is too long"))]
    pub description: Option<String>,

    #[serde(default)]
    pub completed: Option<bool>,

    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub clear_start_date: bool,

    #[serde(default)]
    pub clear_due_date: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MoveCardRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    /// 1-based; values past the end land last
    #[validate(range(min = 1, message = "newPosition must be at least 1"))]
    pub new_position: i64,

    /// Destination list; absent or equal to the current list moves in place
    #[serde(default)]
    #[validate(range(min = 1, message = "listId must be positive"))]
    pub list_id: Option<i64>,
}

/// Every card whose list changed layout, grouped by list then position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveCardResponse {
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CardLabelRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    #[validate(range(min = 1, message = "labelId must be positive"))]
    pub label_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    #[validate(length(min = 1, max = 4000, message = "content must be 1-4000 characters"))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    #[validate(range(min = 1, message = "commentId must be positive"))]
    pub comment_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttachmentRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    #[validate(length(min = 1, max = 255, message = "fileName must be 1-255 characters"))]
    pub file_name: String,

    #[validate(length(min = 1, max = 255, message = "contentType must be 1-255 characters"))]
    pub content_type: String,

    #[validate(range(min = 0, message = "sizeBytes must not be negative"))]
    pub size_bytes: i64,

    #[validate(length(min = 1, max = 1024, message = "storageKey must be 1-1024 characters"))]
    pub storage_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAttachmentRequest {
    #[validate(range(min = 1, message = "id must be positive"))]
    pub id: i64,

    #[validate(range(min = 1, message = "attachmentId must be positive"))]
    pub attachment_id: i64,
}

#[derive(Debug, Clone)]
pub struct CardClient {
    rpc: RpcClient,
}

impl CardClient {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub async fn create_card(&self, md: &Metadata, req: &CreateCardRequest) -> StatusResult<Card> {
        self.rpc.call(method::CREATE_CARD, md, req).await
    }

    pub async fn get_card_by_id(&self, md: &Metadata, req: &IdRequest) -> StatusResult<CardDetail> {
        self.rpc.call(method::GET_CARD_BY_ID, md, req).await
    }

    pub async fn get_cards_by_list(&self, md: &Metadata, req: &GetCardsByListRequest) -> StatusResult<CardsResponse> {
        self.rpc.call(method::GET_CARDS_BY_LIST, md, req).await
    }

    pub async fn update_card(&self, md: &Metadata, req: &UpdateCardRequest) -> StatusResult<Card> {
        self.rpc.call(method::UPDATE_CARD, md, req).await
    }

    pub async fn move_card(&self, md: &Metadata, req: &MoveCardRequest) -> StatusResult<MoveCardResponse> {
        self.rpc.call(method::MOVE_CARD, md, req).await
    }

    pub async fn archive_card(&self, md: &Metadata, req: &IdRequest) -> StatusResult<Card> {
        self.rpc.call(method::ARCHIVE_CARD, md, req).await
    }

    pub async fn restore_card(&self, md: &Metadata, req: &IdRequest) -> StatusResult<Card> {
        self.rpc.call(method::RESTORE_CARD, md, req).await
    }

    pub async fn delete_card(&self, md: &Metadata, req: &IdRequest) -> StatusResult<Empty> {
        self.rpc.call(method::DELETE_CARD, md, req).await
    }

    pub async fn add_card_label(&self, md: &Metadata, req: &CardLabelRequest) -> StatusResult<Empty> {
        self.rpc.call(method::ADD_CARD_LABEL, md, req).await
    }

    pub async fn remove_card_label(&self, md: &Metadata, req: &CardLabelRequest) -> StatusResult<Empty> {
        self.rpc.call(method::REMOVE_CARD_LABEL, md, req).await
    }

    pub async fn create_comment(&self, md: &Metadata, req: &CreateCommentRequest) -> StatusResult<Comment> {
        self.rpc.call(method::CREATE_COMMENT, md, req).await
    }

    pub async fn delete_comment(&self, md: &Metadata, req: &DeleteCommentRequest) -> StatusResult<Empty> {
        self.rpc.call(method::DELETE_COMMENT, md, req).await
    }

    pub async fn create_attachment(&self, md: &Metadata, req: &CreateAttachmentRequest) -> StatusResult<Attachment> {
        self.rpc.call(method::CREATE_ATTACHMENT, md, req).await
    }

    pub async fn delete_attachment(&self, md: &Metadata, req: &DeleteAttachmentRequest) -> StatusResult<Empty> {
        self.rpc.call(method::DELETE_ATTACHMENT, md, req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_move_card_position_floor() {
        let req: MoveCardRequest = serde_json::from_value(json!({"id": 1, "newPosition": 0})).unwrap();
        assert!(req.validate().is_err());

        let req: MoveCardRequest =
            serde_json::from_value(json!({"id": 1, "newPosition": 2, "listId": 5})).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.list_id, Some(5));
    }

    #[test]
    fn test_update_card_dates_parse_rfc3339() {
        let req: UpdateCardRequest = serde_json::from_value(json!({
            "id": 1,
            "dueDate": "2026-03-01T12:00:00Z",
            "clearStartDate": true
        }))
        .unwrap();
        assert!(req.due_date.is_some());
        assert!(req.clear_start_date);
        assert!(!req.clear_due_date);
    }
}
