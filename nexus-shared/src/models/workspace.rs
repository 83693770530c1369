/// Workspace model and database operations
///
/// Like boards, a workspace is created together with its creator's `admin`
/// membership in one transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::PageRequest;
use crate::auth::roles::{RoleHierarchy, WorkspaceRole};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Workspace {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateWorkspace {
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
}

impl Workspace {
    /// Creates a workspace and makes the owner its admin
    pub async fn create_with_owner(
        pool: &PgPool,
        data: CreateWorkspace,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            INSERT INTO workspaces (owner_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, owner_id, name, description, created_at, updated_at
            "#,
        )
        .bind(data.owner_id)
        .bind(&data.name)
        .bind(&data.description)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO workspace_members (workspace_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(workspace.id)
        .bind(data.owner_id)
        .bind(WorkspaceRole::Admin.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(workspace)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            SELECT id, owner_id, name, description, created_at, updated_at
            FROM workspaces
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(workspace)
    }

    /// Lists the workspaces a user belongs to
    pub async fn list_for_member(
        pool: &PgPool,
        user_id: Uuid,
        page: &PageRequest,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT w.id, w.owner_id, w.name, w.description, w.created_at, w.updated_at
            FROM workspaces w
            JOIN workspace_members m ON m.workspace_id = w.id
            WHERE m.user_id = $1
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            page.order_by("w")
        );

        let workspaces = sqlx::query_as::<_, Workspace>(&query)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok(workspaces)
    }
}
