/// Projects inside a workspace
///
/// Access to a project is decided by the caller's role in the owning
/// workspace, see [`crate::auth::authorization::require_project_role`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::PageRequest;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub description: String,

    /// `active`, `archived` or `completed`
    pub status: String,

    /// Hex color, e.g. `#1E90FF`
    pub color: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateProject {
    pub workspace_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub description: String,
    pub status: String,
    pub color: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub color: Option<String>,
}

impl Project {
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (workspace_id, created_by, name, description, status, color)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, workspace_id, created_by, name, description, status, color,
                      created_at, updated_at
            "#,
        )
        .bind(data.workspace_id)
        .bind(data.created_by)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.status)
        .bind(&data.color)
        .fetch_one(pool)
        .await?;

        Ok(project)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, workspace_id, created_by, name, description, status, color,
                   created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Workspace a project belongs to
    pub async fn workspace_id_of(pool: &PgPool, id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT workspace_id FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(|(workspace_id,)| workspace_id))
    }

    pub async fn list_by_workspace(
        pool: &PgPool,
        workspace_id: Uuid,
        page: &PageRequest,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT p.id, p.workspace_id, p.created_by, p.name, p.description, p.status,
                   p.color, p.created_at, p.updated_at
            FROM projects p
            WHERE p.workspace_id = $1
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            page.order_by("p")
        );

        let projects = sqlx::query_as::<_, Project>(&query)
            .bind(workspace_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok(projects)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                color = COALESCE($5, color),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, workspace_id, created_by, name, description, status, color,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.status)
        .bind(data.color)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
