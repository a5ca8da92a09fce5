/// Board roles and the rules for handing them out
///
/// Roles form a strict total order:
///
/// ```text
/// observer (1) < member (2) < admin (3) < owner (4)
/// ```
///
/// A member can only assign roles strictly below their own. The owner role is
/// never assigned directly; it moves only through ownership transfer.
///
/// # Example
///
/// ```
/// use kanban_shared::authz::role::{can_assign_role, Role};
///
/// assert!(Role::Admin.has_permission(Role::Member));
/// assert!(can_assign_role(Role::Owner, Role::Admin));
/// assert!(!can_assign_role(Role::Admin, Role::Admin));
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a user on one board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "board_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read-only access, may comment
    Observer,

    /// Can create and edit lists and cards
    Member,

    /// Can manage members, labels, and archive the board
    Admin,

    /// Exactly one per board; can delete the board and transfer ownership
    Owner,
}

impl Role {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Observer => "observer",
            Role::Member => "member",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Numeric rank used for comparisons
    pub fn rank(&self) -> u8 {
        match self {
            Role::Observer => 1,
            Role::Member => 2,
            Role::Admin => 3,
            Role::Owner => 4,
        }
    }

    /// True if this role is at least `required`
    pub fn has_permission(&self, required: Role) -> bool {
        self.rank() >= required.rank()
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "observer" => Ok(Role::Observer),
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// True iff `actor` may hand out `target`
///
/// The target must be strictly below the actor, which also means nobody can
/// assign the owner role through this path.
pub fn can_assign_role(actor: Role, target: Role) -> bool {
    actor.rank() > target.rank()
}

/// Checks a full role change on an existing member
///
/// The actor must outrank both the member's current role and the new one.
/// Owners are excluded: the sole owner can only be replaced by transfer.
pub fn can_change_role(actor: Role, current: Role, new_role: Role) -> bool {
    current != Role::Owner && can_assign_role(actor, current) && can_assign_role(actor, new_role)
}
