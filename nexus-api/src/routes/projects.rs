/// Project endpoints
///
/// Projects are created and listed under their workspace; reads and writes
/// by id go through `/projects/:project_id`, where the guard resolves the
/// owning workspace before checking the caller's role there.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Pagination, ValidJson},
    response::ApiResponse,
    validation,
};
use axum::{extract::State, Extension};
use nexus_shared::{
    auth::{
        authorization::{ProjectAccess, WorkspaceAccess},
        middleware::CurrentUser,
    },
    models::project::{CreateProject, Project, UpdateProject},
};
use serde::Deserialize;
use validator::Validate;

const DEFAULT_STATUS: &str = "active";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 32, message = "name must be 1 to 32 characters"))]
    pub name: String,

    #[validate(length(max = 1024, message = "description must be at most 1024 characters"))]
    #[serde(default)]
    pub description: String,

    /// Defaults to `active`
    #[validate(custom(function = "validation::project_status"))]
    pub status: Option<String>,

    #[validate(custom(function = "validation::hex_color"))]
    pub color: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 32, message = "name must be 1 to 32 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 1024, message = "description must be at most 1024 characters"))]
    pub description: Option<String>,

    #[validate(custom(function = "validation::project_status"))]
    pub status: Option<String>,

    #[validate(custom(function = "validation::hex_color"))]
    pub color: Option<String>,
}

fn project_not_found() -> ApiError {
    ApiError::NotFound("project not found".to_string())
}

/// `POST /workspaces/:workspace_id/projects/create` (manager)
pub async fn create_project(
    State(state): State<AppState>,
    Extension(access): Extension<WorkspaceAccess>,
    user: CurrentUser,
    ValidJson(req): ValidJson<CreateProjectRequest>,
) -> ApiResult<ApiResponse<Project>> {
    let project = Project::create(
        &state.db,
        CreateProject {
            workspace_id: access.workspace_id,
            created_by: user.id,
            name: req.name,
            description: req.description,
            status: req.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            color: req.color,
        },
    )
    .await?;

    tracing::info!(
        project_id = %project.id,
        workspace_id = %access.workspace_id,
        "project created"
    );
    Ok(ApiResponse::created("project created successfully", project))
}

/// `GET /workspaces/:workspace_id/projects/list` (member)
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(access): Extension<WorkspaceAccess>,
    Pagination(page): Pagination,
) -> ApiResult<ApiResponse<Vec<Project>>> {
    let projects = Project::list_by_workspace(&state.db, access.workspace_id, &page).await?;
    Ok(ApiResponse::ok("projects fetched successfully", projects))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(access): Extension<ProjectAccess>,
) -> ApiResult<ApiResponse<Project>> {
    let project = Project::find_by_id(&state.db, access.project_id)
        .await?
        .ok_or_else(project_not_found)?;

    Ok(ApiResponse::ok("project fetched successfully", project))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(access): Extension<ProjectAccess>,
    ValidJson(req): ValidJson<UpdateProjectRequest>,
) -> ApiResult<ApiResponse<Project>> {
    let project = Project::update(
        &state.db,
        access.project_id,
        UpdateProject {
            name: req.name,
            description: req.description,
            status: req.status,
            color: req.color,
        },
    )
    .await?
    .ok_or_else(project_not_found)?;

    Ok(ApiResponse::ok("project updated successfully", project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(access): Extension<ProjectAccess>,
) -> ApiResult<ApiResponse<()>> {
    if !Project::delete(&state.db, access.project_id).await? {
        return Err(project_not_found());
    }

    tracing::info!(project_id = %access.project_id, "project deleted");
    Ok(ApiResponse::message("project deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_project_validation() {
        let req: CreateProjectRequest =
            serde_json::from_str(r##"{"name":"Launch","color":"#00ff00"}"##).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.description, "");

        let req: CreateProjectRequest = serde_json::from_str(
            r##"{"name":"Launch","color":"#00ff00","status":"paused"}"##,
        )
        .unwrap();
        assert!(req.validate().unwrap_err().field_errors().contains_key("status"));
    }

    #[test]
    fn test_update_project_allows_partial_body() {
        let req: UpdateProjectRequest = serde_json::from_str(r#"{"status":"completed"}"#).unwrap();
        assert!(req.validate().is_ok());
    }
}
