/// Workspace membership rows
///
/// Roles are stored as text. Rows with a role name outside
/// [`WorkspaceRole`] are kept but ignored by authorization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::roles::{RoleHierarchy, WorkspaceRole};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkspaceMember {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub invited_at: DateTime<Utc>,
    pub joined_at: Option<DateTime<Utc>>,
}

impl WorkspaceMember {
    /// Role strings a user holds in a workspace
    pub async fn roles_for(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        let roles: Vec<(String,)> = sqlx::query_as(
            "SELECT role FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(roles.into_iter().map(|(role,)| role).collect())
    }

    /// Changes a member's role, returning `None` if they aren't a member
    pub async fn update_role(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
        role: WorkspaceRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, WorkspaceMember>(
            r#"
            UPDATE workspace_members
            SET role = $3
            WHERE workspace_id = $1 AND user_id = $2
            RETURNING id, workspace_id, user_id, role, invited_at, joined_at
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(role.as_str())
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    pub async fn list_by_workspace(
        pool: &PgPool,
        workspace_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let members = sqlx::query_as::<_, WorkspaceMember>(
            r#"
            SELECT id, workspace_id, user_id, role, invited_at, joined_at
            FROM workspace_members
            WHERE workspace_id = $1
            ORDER BY invited_at ASC
            "#,
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }
}
