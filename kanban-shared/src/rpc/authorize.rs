/// Authorization interceptor
///
/// Every method of a service appears exactly once in its policy table:
///
/// - `Exempt`: no checks; ids in metadata are picked up when well-formed
/// - `Authenticated`: `userid` required, no board scope
/// - `Role(min)`: `userid` and `boardid` required, the subject named in the
///   body must belong to that board, and the oracle must report a role of at
///   least `min`
///
/// A method missing from the table is refused with `forbidden: unknown method`.
///
/// # Example
///
/// ```no_run
/// use kanban_shared::authz::role::Role;
/// use kanban_shared::rpc::authorize::{AuthorizationInterceptor, MethodRule, Subject};
/// # use std::sync::Arc;
/// # fn example(
/// #     oracle: Arc<dyn kanban_shared::authz::oracle::RoleOracle>,
/// #     resolver: Arc<dyn kanban_shared::authz::subject::SubjectResolver>,
/// # ) {
/// const RULES: &[MethodRule] = &[
///     MethodRule::exempt("kanban.list.ListService/GetListById"),
///     MethodRule::role("kanban.list.ListService/UpdateList", Role::Member, Subject::List("id")),
/// ];
///
/// let authz = AuthorizationInterceptor::new(RULES, oracle, resolver);
/// # }
/// ```

use super::chain::{handler_fn, Handler, Interceptor, RpcRequest};
use super::metadata::{self, parse_id};
use crate::authz::oracle::{RoleCheck, RoleOracle};
use crate::authz::role::Role;
use crate::authz::subject::SubjectResolver;
use crate::error::{FieldViolation, Status, StatusResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Exempt,
    Authenticated,
    Role(Role),
}

/// Entity the request body names, and the body field carrying its id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    /// Nothing beyond the metadata board
    None,

    /// A board id that must equal the metadata board
    Board(&'static str),

    /// A list whose owning board must equal the metadata board
    List(&'static str),

    /// A card whose owning board must equal the metadata board
    Card(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodRule {
    pub method: &'static str,
    pub policy: Policy,
    pub subject: Subject,
}

impl MethodRule {
    pub const fn exempt(method: &'static str) -> Self {
        Self {
            method,
            policy: Policy::Exempt,
            subject: Subject::None,
        }
    }

    pub const fn authenticated(method: &'static str) -> Self {
        Self {
            method,
            policy: Policy::Authenticated,
            subject: Subject::None,
        }
    }

    pub const fn role(method: &'static str, role: Role, subject: Subject) -> Self {
        Self {
            method,
            policy: Policy::Role(role),
            subject,
        }
    }
}

/// Problems with a policy table against the registered methods
///
/// Reports methods with no rule, methods with more than one rule, and rules
/// for methods that are not registered. Empty means full coverage.
pub fn coverage_gaps(methods: &[&str], rules: &[MethodRule]) -> Vec<String> {
    let mut gaps = Vec::new();
    let registered: HashSet<&str> = methods.iter().copied().collect();

    for method in methods {
        match rules.iter().filter(|r| r.method == *method).count() {
            0 => gaps.push(format!("{} has no policy", method)),
            1 => {}
            n => gaps.push(format!("{} has {} policies", method, n)),
        }
    }
    for rule in rules {
        if !registered.contains(rule.method) {
            gaps.push(format!("{} is not a registered method", rule.method));
        }
    }
    gaps
}

#[derive(Clone)]
pub struct AuthorizationInterceptor {
    rules: Arc<HashMap<&'static str, MethodRule>>,
    oracle: Arc<dyn RoleOracle>,
    resolver: Arc<dyn SubjectResolver>,
}

impl AuthorizationInterceptor {
    pub fn new(
        rules: &[MethodRule],
        oracle: Arc<dyn RoleOracle>,
        resolver: Arc<dyn SubjectResolver>,
    ) -> Self {
        let rules = rules.iter().map(|r| (r.method, *r)).collect();
        Self {
            rules: Arc::new(rules),
            oracle,
            resolver,
        }
    }

    pub fn policy_of(&self, method: &str) -> Option<Policy> {
        self.rules.get(method).map(|r| r.policy)
    }

    async fn authorize(&self, mut req: RpcRequest) -> StatusResult<RpcRequest> {
        let rule = self
            .rules
            .get(req.method.as_str())
            .copied()
            .ok_or_else(|| Status::forbidden("unknown method"))?;

        let user = parse_id(metadata::USER_ID, req.metadata.user_id.as_deref());
        let board = parse_id(metadata::BOARD_ID, req.metadata.board_id.as_deref());

        match rule.policy {
            Policy::Exempt => {
                req.context.user_id = user.ok().flatten();
                req.context.board_id = board.ok().flatten();
            }
            Policy::Authenticated => {
                let user = match user {
                    Ok(Some(id)) => id,
                    Ok(None) => return Err(Status::validation(vec![metadata::missing(metadata::USER_ID)])),
                    Err(violation) => return Err(Status::validation(vec![violation])),
                };
                req.context.user_id = Some(user);
                req.context.board_id = board.ok().flatten();
            }
            Policy::Role(required) => {
                let (user, board) = required_ids(user, board)?;
                self.verify_subject(&rule, &req, board).await?;

                let check = self
                    .oracle
                    .check_board_user_role(&req.metadata, user, board, required)
                    .await?;

                match check {
                    RoleCheck::Ok { role } => {
                        req.context.role = Some(role);
                    }
                    RoleCheck::Denied { reason } => {
                        tracing::debug!(
                            method = %req.method,
                            user_id = user,
                            board_id = board,
                            required = %required,
                            "Role check denied"
                        );
                        return Err(Status::forbidden(reason));
                    }
                    RoleCheck::NotFound => {
                        return Err(Status::not_found("board not found"));
                    }
                }

                req.context.user_id = Some(user);
                req.context.board_id = Some(board);
            }
        }

        Ok(req)
    }

    /// Checks that the entity named in the body lives on `board`
    async fn verify_subject(&self, rule: &MethodRule, req: &RpcRequest, board: i64) -> StatusResult<()> {
        let owning = match rule.subject {
            Subject::None => return Ok(()),
            Subject::Board(field) => Some(body_id(req, field)?),
            Subject::List(field) => self.resolver.board_of_list(body_id(req, field)?).await?,
            Subject::Card(field) => self.resolver.board_of_card(body_id(req, field)?).await?,
        };

        match owning {
            Some(owner) if owner == board => Ok(()),
            _ => {
                tracing::debug!(
                    method = %req.method,
                    board_id = board,
                    resolved = ?owning,
                    "Subject does not belong to the scoped board"
                );
                Err(Status::not_found("resource not found"))
            }
        }
    }
}

fn required_ids(
    user: Result<Option<i64>, FieldViolation>,
    board: Result<Option<i64>, FieldViolation>,
) -> StatusResult<(i64, i64)> {
    let mut violations = Vec::new();
    let mut take = |key: &'static str, parsed: Result<Option<i64>, FieldViolation>| match parsed {
        Ok(Some(id)) => Some(id),
        Ok(None) => {
            violations.push(metadata::missing(key));
            None
        }
        Err(violation) => {
            violations.push(violation);
            None
        }
    };

    let user = take(metadata::USER_ID, user);
    let board = take(metadata::BOARD_ID, board);

    match (user, board) {
        (Some(user), Some(board)) => Ok((user, board)),
        _ => Err(Status::validation(violations)),
    }
}

fn body_id(req: &RpcRequest, field: &'static str) -> StatusResult<i64> {
    req.body
        .get(field)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| {
            Status::validation(vec![FieldViolation::new(
                field,
                "required",
                format!("{} is required", field),
            )])
        })
}

impl Interceptor for AuthorizationInterceptor {
    fn wrap(&self, next: Handler) -> Handler {
        let authz = self.clone();
        handler_fn(move |req| {
            let authz = authz.clone();
            let next = next.clone();
            async move {
                let req = authz.authorize(req).await?;
                next(req).await
            }
        })
    }
}
