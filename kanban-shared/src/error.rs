/// Error taxonomy shared by every service
///
/// All RPC handlers, interceptors and repositories report failures as a
/// [`Status`]. The status travels over the wire as a JSON envelope and is
/// mapped to an HTTP code by the gateway.
///
/// # Codes
///
/// | Code | Meaning | Gateway HTTP |
/// |---|---|---|
/// | `validation_failed` | one or more field-level problems | 400 |
/// | `unauthenticated` | missing or invalid bearer token | 401 |
/// | `forbidden` | role insufficient or rule on roles violated | 403 |
/// | `not_found` | subject does not exist within scope | 404 |
/// | `conflict` | uniqueness violation or state precondition for delete | 409 |
/// | `precondition_failed` | domain rule violated | 412 |
/// | `unavailable` | transient dependency outage or deadline expiry | 503 |
/// | `internal` | anything else | 500 |
///
/// # Example
///
/// ```
/// use kanban_shared::error::{Code, FieldViolation, Status};
///
/// let status = Status::validation(vec![
///     FieldViolation::new("name", "required", "name is required"),
/// ]);
/// assert_eq!(status.code, Code::ValidationFailed);
/// assert_eq!(status.details.len(), 1);
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result alias used by handlers and repositories
pub type StatusResult<T> = Result<T, Status>;

/// Semantic error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    ValidationFailed,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    PreconditionFailed,
    Unavailable,
    Internal,
}

impl Code {
    /// Wire name of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::ValidationFailed => "validation_failed",
            Code::Unauthenticated => "unauthenticated",
            Code::Forbidden => "forbidden",
            Code::NotFound => "not_found",
            Code::Conflict => "conflict",
            Code::PreconditionFailed => "precondition_failed",
            Code::Unavailable => "unavailable",
            Code::Internal => "internal",
        }
    }

    /// HTTP status used when the code crosses an HTTP boundary
    pub fn http_status(&self) -> u16 {
        match self {
            Code::ValidationFailed => 400,
            Code::Unauthenticated => 401,
            Code::Forbidden => 403,
            Code::NotFound => 404,
            Code::Conflict => 409,
            Code::PreconditionFailed => 412,
            Code::Unavailable => 503,
            Code::Internal => 500,
        }
    }
}

/// One field-level validation problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Field that failed (dotted path for nested fields)
    pub field: String,

    /// Machine-readable reason, e.g. `required`, `length`, `range`
    pub code: String,

    /// Human-readable message
    pub message: String,
}

impl FieldViolation {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Error carried across every service boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Error kind
    pub code: Code,

    /// Message (replaced by a generic text for `internal` at the edge)
    pub message: String,

    /// Field violations, only populated for `validation_failed`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldViolation>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for Status {}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Aggregated validation failure
    pub fn validation(details: Vec<FieldViolation>) -> Self {
        Self {
            code: Code::ValidationFailed,
            message: format!("validation failed: {} error(s)", details.len()),
            details,
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(Code::Unauthenticated, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(Code::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(Code::Conflict, message)
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new(Code::PreconditionFailed, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }
}

/// Repository choke point: every sqlx failure becomes a taxonomy error here
impl From<sqlx::Error> for Status {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Status::not_found("resource not found"),
            sqlx::Error::Database(db_err) => {
                match db_err.code().as_deref() {
                    // unique_violation
                    Some("23505") => {
                        let what = db_err.constraint().unwrap_or("unique constraint");
                        Status::conflict(format!("already exists ({})", what))
                    }
                    // foreign_key_violation
                    Some("23503") => Status::not_found("referenced resource not found"),
                    // serialization_failure, deadlock_detected
                    Some("40001") | Some("40P01") => {
                        Status::unavailable("concurrent modification, retry the request")
                    }
                    // query_canceled (statement timeout / cancel hook)
                    Some("57014") => Status::unavailable("query cancelled"),
                    _ => Status::internal(format!("database error: {}", db_err)),
                }
            }
            sqlx::Error::PoolTimedOut => Status::unavailable("database pool exhausted"),
            sqlx::Error::Io(e) => Status::unavailable(format!("database unreachable: {}", e)),
            other => Status::internal(format!("database error: {}", other)),
        }
    }
}

/// Validation errors from `validator` derive, flattened into field violations
impl From<validator::ValidationErrors> for Status {
    fn from(errors: validator::ValidationErrors) -> Self {
        Status::validation(flatten_validation_errors(&errors, None))
    }
}

/// Walks nested `ValidationErrors` and collects every failure
pub fn flatten_validation_errors(
    errors: &validator::ValidationErrors,
    prefix: Option<&str>,
) -> Vec<FieldViolation> {
    use validator::ValidationErrorsKind;

    let mut out = Vec::new();
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(p) => format!("{}.{}", p, field),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for e in field_errors {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", path));
                    out.push(FieldViolation::new(path.clone(), e.code.to_string(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                out.extend(flatten_validation_errors(inner, Some(&path)));
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    let item_path = format!("{}[{}]", path, idx);
                    out.extend(flatten_validation_errors(inner, Some(&item_path)));
                }
            }
        }
    }
    // HashMap iteration order is unstable; keep responses deterministic
    out.sort_by(|a, b| a.field.cmp(&b.field).then(a.code.cmp(&b.code)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
        #[validate(range(min = 1))]
        position: i32,
    }

    #[test]
    fn test_code_http_mapping() {
        assert_eq!(Code::ValidationFailed.http_status(), 400);
        assert_eq!(Code::Unauthenticated.http_status(), 401);
        assert_eq!(Code::Forbidden.http_status(), 403);
        assert_eq!(Code::NotFound.http_status(), 404);
        assert_eq!(Code::Conflict.http_status(), 409);
        assert_eq!(Code::PreconditionFailed.http_status(), 412);
        assert_eq!(Code::Unavailable.http_status(), 503);
        assert_eq!(Code::Internal.http_status(), 500);
    }

    #[test]
    fn test_status_display() {
        let status = Status::forbidden("unknown method");
        assert_eq!(status.to_string(), "forbidden: unknown method");
    }

    #[test]
    fn test_validation_errors_are_aggregated() {
        let probe = Probe {
            name: String::new(),
            position: 0,
        };
        let status: Status = probe.validate().unwrap_err().into();

        assert_eq!(status.code, Code::ValidationFailed);
        assert_eq!(status.details.len(), 2);
        assert_eq!(status.details[0].field, "name");
        assert_eq!(status.details[0].message, "name is required");
        assert_eq!(status.details[1].field, "position");
        assert_eq!(status.details[1].code, "range");
    }

    #[test]
    fn test_status_wire_format() {
        let status = Status::validation(vec![FieldViolation::new("userid", "required", "missing")]);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["code"], "validation_failed");
        assert_eq!(json["details"][0]["field"], "userid");

        let plain = serde_json::to_value(Status::not_found("x")).unwrap();
        assert!(plain.get("details").is_none());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let status: Status = sqlx::Error::RowNotFound.into();
        assert_eq!(status.code, Code::NotFound);
    }
}
