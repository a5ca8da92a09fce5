/// RPC metadata carried as HTTP headers
///
/// | Header | Meaning |
/// |---|---|
/// | `userid` | caller's user id, ASCII decimal |
/// | `boardid` | board scope of the call, ASCII decimal |
/// | `x-request-id` | correlation id, propagated hop to hop |
/// | `x-deadline-ms` | remaining budget in milliseconds |
///
/// Values are kept raw here; the authorization interceptor parses and
/// reports them.

use crate::error::FieldViolation;
use std::time::Duration;

pub const USER_ID: &str = "userid";
pub const BOARD_ID: &str = "boardid";
pub const REQUEST_ID: &str = "x-request-id";
pub const DEADLINE_MS: &str = "x-deadline-ms";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub user_id: Option<String>,
    pub board_id: Option<String>,
    pub request_id: Option<String>,
    pub deadline_ms: Option<u64>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn with_board(mut self, board_id: i64) -> Self {
        self.board_id = Some(board_id.to_string());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_timeout(mut self, budget: Duration) -> Self {
        self.deadline_ms = Some(budget.as_millis() as u64);
        self
    }

    /// Reads metadata from incoming request headers
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            user_id: get(USER_ID),
            board_id: get(BOARD_ID),
            request_id: get(REQUEST_ID),
            deadline_ms: get(DEADLINE_MS).and_then(|v| v.parse().ok()),
        }
    }

    /// Header pairs for an outgoing call with the given budget
    pub fn header_pairs(&self, budget: Duration) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(4);
        if let Some(v) = &self.user_id {
            pairs.push((USER_ID, v.clone()));
        }
        if let Some(v) = &self.board_id {
            pairs.push((BOARD_ID, v.clone()));
        }
        if let Some(v) = &self.request_id {
            pairs.push((REQUEST_ID, v.clone()));
        }
        pairs.push((DEADLINE_MS, budget.as_millis().to_string()));
        pairs
    }
}

/// Parses an id header
///
/// `Ok(None)` when absent; a violation when present but not a positive
/// decimal integer.
pub fn parse_id(key: &'static str, raw: Option<&str>) -> Result<Option<i64>, FieldViolation> {
    match raw {
        None => Ok(None),
        Some(value) => match value.parse::<i64>() {
            Ok(id) if id > 0 => Ok(Some(id)),
            _ => Err(FieldViolation::new(
                key,
                "invalid",
                format!("{} must be a positive decimal integer", key),
            )),
        },
    }
}

/// Violation for a missing required header
pub fn missing(key: &'static str) -> FieldViolation {
    FieldViolation::new(key, "required", format!("{} metadata is required", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID, HeaderValue::from_static("12"));
        headers.insert(BOARD_ID, HeaderValue::from_static(" 34 "));
        headers.insert(DEADLINE_MS, HeaderValue::from_static("250"));

        let md = Metadata::from_headers(&headers);
        assert_eq!(md.user_id.as_deref(), Some("12"));
        assert_eq!(md.board_id.as_deref(), Some("34"));
        assert_eq!(md.deadline_ms, Some(250));
        assert_eq!(md.request_id, None);
    }

    #[test]
    fn test_header_pairs_always_carry_deadline() {
        let md = Metadata::new().with_user(1).with_request_id("abc");
        let pairs = md.header_pairs(Duration::from_millis(1500));

        assert!(pairs.contains(&(USER_ID, "1".to_string())));
        assert!(pairs.contains(&(REQUEST_ID, "abc".to_string())));
        assert!(pairs.contains(&(DEADLINE_MS, "1500".to_string())));
        assert!(!pairs.iter().any(|(k, _)| *k == BOARD_ID));
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(USER_ID, None).unwrap(), None);
        assert_eq!(parse_id(USER_ID, Some("42")).unwrap(), Some(42));
        assert!(parse_id(USER_ID, Some("-1")).is_err());
        assert!(parse_id(BOARD_ID, Some("abc")).is_err());
    }
}
