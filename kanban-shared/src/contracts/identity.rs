/// Identity service contract
///
/// Users, credentials, tokens and the board role oracle.

use super::common::IdRequest;
use crate::authz::oracle::{RoleCheck, RoleOracle, VisibilityCheck};
use crate::authz::role::Role;
use crate::error::StatusResult;
use crate::models::user::User;
use crate::rpc::client::RpcClient;
use crate::rpc::metadata::Metadata;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const SERVICE: &str = "kanban.identity.IdentityService";

pub mod method {
    pub const CREATE_USER: &str = "kanban.identity.IdentityService/CreateUser";
    pub const LOGIN: &str = "kanban.identity.IdentityService/Login";
    pub const REFRESH_TOKEN: &str = "kanban.identity.IdentityService/RefreshToken";
    pub const AUTHENTICATE: &str = "kanban.identity.IdentityService/Authenticate";
    pub const CHANGE_EMAIL: &str = "kanban.identity.IdentityService/ChangeEmail";
    pub const CONFIRM_NEW_EMAIL: &str = "kanban.identity.IdentityService/ConfirmNewEmail";
    pub const GET_USER_BY_ID: &str = "kanban.identity.IdentityService/GetUserById";
    pub const CHECK_BOARD_USER_ROLE: &str = "kanban.identity.IdentityService/CheckBoardUserRole";
    pub const CHECK_BOARD_VISIBILITY: &str = "kanban.identity.IdentityService/CheckBoardVisibility";
}

pub const METHODS: &[&str] = &[
    method::CREATE_USER,
    method::LOGIN,
    method::REFRESH_TOKEN,
    method::AUTHENTICATE,
    method::CHANGE_EMAIL,
    method::CONFIRM_NEW_EMAIL,
    method::GET_USER_BY_ID,
    method::CHECK_BOARD_USER_ROLE,
    method::CHECK_BOARD_VISIBILITY,
];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 32, message = "username must be 3-32 characters"))]
    pub username: String,

    #[validate(length(min = 1, max = 128, message = "password must be 1-128 characters"))]
    pub password: String,

    #[validate(email(message = "email is invalid"))]
    pub email: String,

    #[serde(rename = "fullname")]
    #[validate(length(min = 1, max = 255, message = "fullname must be 1-255 characters"))]
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "refreshToken is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthenticateRequest {
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateResponse {
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEmailRequest {
    #[validate(email(message = "newEmail is invalid"))]
    pub new_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEmailResponse {
    pub new_email: String,
    pub token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfirmNewEmailRequest {
    #[serde(rename = "userID")]
    #[validate(range(min = 1, message = "userID must be positive"))]
    pub user_id: i64,

    #[validate(length(equal = 32, message = "token must be 32 hex characters"))]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckBoardUserRoleRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,

    #[validate(range(min = 1))]
    pub board_id: i64,

    pub required_role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckBoardVisibilityRequest {
    #[serde(default)]
    pub user_id: Option<i64>,

    #[validate(range(min = 1))]
    pub board_id: i64,
}

/// Typed client for the identity service
///
/// Also serves as the role oracle for the entity services.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    rpc: RpcClient,
}

impl IdentityClient {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub async fn create_user(&self, md: &Metadata, req: &CreateUserRequest) -> StatusResult<User> {
        self.rpc.call(method::CREATE_USER, md, req).await
    }

    pub async fn login(&self, md: &Metadata, req: &LoginRequest) -> StatusResult<TokenPair> {
        self.rpc.call(method::LOGIN, md, req).await
    }

    pub async fn refresh_token(&self, md: &Metadata, req: &RefreshTokenRequest) -> StatusResult<TokenPair> {
        self.rpc.call(method::REFRESH_TOKEN, md, req).await
    }

    pub async fn authenticate(&self, md: &Metadata, req: &AuthenticateRequest) -> StatusResult<AuthenticateResponse> {
        self.rpc.call(method::AUTHENTICATE, md, req).await
    }

    pub async fn change_email(&self, md: &Metadata, req: &ChangeEmailRequest) -> StatusResult<ChangeEmailResponse> {
        self.rpc.call(method::CHANGE_EMAIL, md, req).await
    }

    pub async fn confirm_new_email(&self, md: &Metadata, req: &ConfirmNewEmailRequest) -> StatusResult<User> {
        self.rpc.call(method::CONFIRM_NEW_EMAIL, md, req).await
    }

    pub async fn get_user_by_id(&self, md: &Metadata, req: &IdRequest) -> StatusResult<User> {
        self.rpc.call(method::GET_USER_BY_ID, md, req).await
    }
}

#[async_trait]
impl RoleOracle for IdentityClient {
    async fn check_board_user_role(
        &self,
        metadata: &Metadata,
        user_id: i64,
        board_id: i64,
        required: Role,
    ) -> StatusResult<RoleCheck> {
        let req = CheckBoardUserRoleRequest {
            user_id,
            board_id,
            required_role: required,
        };
        self.rpc.call(method::CHECK_BOARD_USER_ROLE, metadata, &req).await
    }

    async fn check_board_visibility(
        &self,
        metadata: &Metadata,
        user_id: Option<i64>,
        board_id: i64,
    ) -> StatusResult<VisibilityCheck> {
        let req = CheckBoardVisibilityRequest { user_id, board_id };
        self.rpc.call(method::CHECK_BOARD_VISIBILITY, metadata, &req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        let req: CreateUserRequest = serde_json::from_value(json!({
            "username": "alice",
            "password": "pw",
            "email": "a@x.io",
            "fullname": "Alice"
        }))
        .unwrap();
        assert_eq!(req.full_name, "Alice");
        assert!(req.validate().is_ok());

        let confirm: ConfirmNewEmailRequest =
            serde_json::from_value(json!({"userID": 4, "token": "ab"})).unwrap();
        assert_eq!(confirm.user_id, 4);
        assert!(confirm.validate().is_err());
    }

    #[test]
    fn test_methods_are_qualified() {
        for m in METHODS {
            assert!(m.starts_with(SERVICE));
        }
    }
}
