/// Role hierarchies for boards and workspaces
///
/// Each scope type has a fixed total order of roles, stored as text on the
/// membership row and mapped to a numeric level here.
///
/// # Inverted ordering
///
/// **A LOWER level means MORE privilege.** `admin` is level 1. A member
/// satisfies a requirement when `member.level() <= required.level()`. Do not
/// flip this to a `>=` comparison; every check in the crate relies on it.
///
/// | Scope | admin | manager | member | observer |
/// |-------|-------|---------|--------|----------|
/// | Workspace | 1 | 2 | 3 | - |
/// | Board | 1 | - | 2 | 3 |
///
/// # Example
///
/// ```
/// use nexus_shared::auth::roles::{satisfies, WorkspaceRole};
///
/// assert!(satisfies(WorkspaceRole::Admin, WorkspaceRole::Manager));
/// assert!(!satisfies(WorkspaceRole::Member, WorkspaceRole::Manager));
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed role hierarchy for one scope type
pub trait RoleHierarchy: Copy + fmt::Debug + Send + Sync + 'static {
    /// Numeric level. Lower is more privileged.
    fn level(&self) -> u8;

    /// Role name as stored in the database
    fn as_str(&self) -> &'static str;

    /// Parses a stored role name. Unknown names yield `None`.
    fn parse(role: &str) -> Option<Self>;
}

/// Returns true if `member` is at least as privileged as `required`
///
/// This is the inverted comparison: `member.level() <= required.level()`.
pub fn satisfies<R: RoleHierarchy>(member: R, required: R) -> bool {
    member.level() <= required.level()
}

/// Outcome of scanning stored role strings against a requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleDecision<R> {
    /// A known role satisfied the requirement
    Allowed(R),

    /// Known roles were found but none was privileged enough
    Insufficient(R),

    /// No known role was found
    NotMember,
}

/// Scans stored role strings for one scope and decides access
///
/// Unknown role strings are skipped, not treated as errors. The first known
/// role that satisfies `required` wins. If none does, the most privileged
/// known role is reported back.
pub fn authorize_roles<R, I, S>(stored_roles: I, required: R) -> RoleDecision<R>
where
    R: RoleHierarchy,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut best: Option<R> = None;

    for stored in stored_roles {
        let Some(role) = R::parse(stored.as_ref()) else {
            tracing::debug!(role = stored.as_ref(), "skipping unknown role");
            continue;
        };

        if satisfies(role, required) {
            return RoleDecision::Allowed(role);
        }

        best = match best {
            Some(current) if current.level() <= role.level() => Some(current),
            _ => Some(role),
        };
    }

    match best {
        Some(role) => RoleDecision::Insufficient(role),
        None => RoleDecision::NotMember,
    }
}

/// Role of a user within a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceRole {
    /// Full control, including member management (level 1)
    Admin,

    /// Manages projects (level 2)
    Manager,

    /// Reads and contributes (level 3)
    Member,
}

impl RoleHierarchy for WorkspaceRole {
    fn level(&self) -> u8 {
        match self {
            WorkspaceRole::Admin => 1,
            WorkspaceRole::Manager => 2,
            WorkspaceRole::Member => 3,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            WorkspaceRole::Admin => "admin",
            WorkspaceRole::Manager => "manager",
            WorkspaceRole::Member => "member",
        }
    }

    fn parse(role: &str) -> Option<Self> {
        match role {
            "admin" => Some(WorkspaceRole::Admin),
            "manager" => Some(WorkspaceRole::Manager),
            "member" => Some(WorkspaceRole::Member),
            _ => None,
        }
    }
}

/// Role of a user on a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardRole {
    /// Owns the board: invites, updates and deletes (level 1)
    Admin,

    /// Edits lists and cards (level 2)
    Member,

    /// Read-only access (level 3)
    Observer,
}

impl BoardRole {
    /// Roles that an invitation may grant
    pub fn is_invitable(&self) -> bool {
        matches!(self, BoardRole::Member | BoardRole::Observer)
    }
}

impl RoleHierarchy for BoardRole {
    fn level(&self) -> u8 {
        match self {
            BoardRole::Admin => 1,
            BoardRole::Member => 2,
            BoardRole::Observer => 3,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            BoardRole::Admin => "admin",
            BoardRole::Member => "member",
            BoardRole::Observer => "observer",
        }
    }

    fn parse(role: &str) -> Option<Self> {
        match role {
            "admin" => Some(BoardRole::Admin),
            "member" => Some(BoardRole::Member),
            "observer" => Some(BoardRole::Observer),
            _ => None,
        }
    }
}

impl fmt::Display for WorkspaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BoardRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
