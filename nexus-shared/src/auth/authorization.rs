/// Role-based authorization for boards, workspaces and projects
///
/// Each check does one membership lookup, maps stored role strings through
/// the scope's hierarchy and applies the inverted comparison from
/// [`super::roles`]: allowed iff `member.level() <= required.level()`.
///
/// | Check | Lookup | Hierarchy |
/// |-------|--------|-----------|
/// | [`require_board_role`] | `board_members` row | [`BoardRole`] |
/// | [`require_workspace_role`] | `workspace_members` rows | [`WorkspaceRole`] |
/// | [`require_project_role`] | project's workspace, then as above | [`WorkspaceRole`] |
///
/// Checks are stateless and never cached.
///
/// # Example
///
/// ```no_run
/// use nexus_shared::auth::authorization::require_workspace_role;
/// use nexus_shared::auth::roles::WorkspaceRole;
/// use nexus_shared::store::AccessStore;
/// use uuid::Uuid;
///
/// async fn can_create_project(
///     store: &dyn AccessStore,
///     workspace_id: Uuid,
///     user_id: Uuid,
/// ) -> bool {
///     require_workspace_role(store, workspace_id, user_id, WorkspaceRole::Manager)
///         .await
///         .is_ok()
/// }
/// ```

use serde::Serialize;
use uuid::Uuid;

use super::roles::{authorize_roles, BoardRole, RoleDecision, RoleHierarchy, WorkspaceRole};
use crate::store::AccessStore;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// No membership with a known role in the scope
    #[error("not a member of this {0}")]
    NotMember(&'static str),

    /// Member, but not privileged enough
    #[error("insufficient permissions: requires {required}, has {actual}")]
    InsufficientRole {
        required: &'static str,
        actual: &'static str,
    },

    /// The scope entity itself doesn't exist
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Outcome of a successful board check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardAccess {
    pub board_id: Uuid,
    pub board_name: String,
    pub role: BoardRole,
}

/// Outcome of a successful workspace check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkspaceAccess {
    pub workspace_id: Uuid,
    pub role: WorkspaceRole,
}

/// Outcome of a successful project check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectAccess {
    pub project_id: Uuid,
    pub workspace_id: Uuid,
    pub role: WorkspaceRole,
}

fn decide<R: RoleHierarchy>(
    decision: RoleDecision<R>,
    required: R,
    scope: &'static str,
) -> Result<R, AuthzError> {
    match decision {
        RoleDecision::Allowed(role) => Ok(role),
        RoleDecision::Insufficient(actual) => Err(AuthzError::InsufficientRole {
            required: required.as_str(),
            actual: actual.as_str(),
        }),
        RoleDecision::NotMember => Err(AuthzError::NotMember(scope)),
    }
}

/// Requires the user to hold at least `required` on the board
pub async fn require_board_role(
    store: &dyn AccessStore,
    board_id: Uuid,
    user_id: Uuid,
    required: BoardRole,
) -> Result<BoardAccess, AuthzError> {
    let membership = store
        .find_board_member(board_id, user_id)
        .await?
        .ok_or(AuthzError::NotMember("board"))?;

    let role = decide(
        authorize_roles([membership.role.as_str()], required),
        required,
        "board",
    )?;

    Ok(BoardAccess {
        board_id,
        board_name: membership.board_name,
        role,
    })
}

/// Requires the user to hold at least `required` in the workspace
///
/// Every membership row is scanned; unknown role names are skipped.
pub async fn require_workspace_role(
    store: &dyn AccessStore,
    workspace_id: Uuid,
    user_id: Uuid,
    required: WorkspaceRole,
) -> Result<WorkspaceAccess, AuthzError> {
    let roles = store.workspace_member_roles(workspace_id, user_id).await?;
    let role = decide(authorize_roles(&roles, required), required, "workspace")?;

    Ok(WorkspaceAccess { workspace_id, role })
}

/// Requires the user to hold at least `required` in the project's workspace
pub async fn require_project_role(
    store: &dyn AccessStore,
    project_id: Uuid,
    user_id: Uuid,
    required: WorkspaceRole,
) -> Result<ProjectAccess, AuthzError> {
    let workspace_id = store
        .find_project_workspace(project_id)
        .await?
        .ok_or(AuthzError::NotFound("project"))?;

    let access = require_workspace_role(store, workspace_id, user_id, required).await?;

    Ok(ProjectAccess {
        project_id,
        workspace_id,
        role: access.role,
    })
}
