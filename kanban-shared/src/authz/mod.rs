/// Board-scoped authorization
///
/// # Modules
///
/// - [`role`]: the role ladder `observer < member < admin < owner`
/// - [`oracle`]: role and visibility checks (database or RPC backed)
/// - [`subject`]: resolving the owning board of lists and cards
///
/// # Example
///
/// ```
/// use kanban_shared::authz::role::{can_assign_role, Role};
///
/// assert!(can_assign_role(Role::Admin, Role::Member));
/// assert!(!can_assign_role(Role::Admin, Role::Admin));
/// ```

pub mod oracle;
pub mod role;
pub mod subject;
