/// Workspace endpoints

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Pagination, ValidJson},
    middleware::access::path_id,
    response::ApiResponse,
};
use axum::{
    extract::{Path, State},
    Extension,
};
use nexus_shared::{
    auth::{authorization::WorkspaceAccess, middleware::CurrentUser, roles::WorkspaceRole},
    models::{
        workspace::{CreateWorkspace, Workspace},
        workspace_member::WorkspaceMember,
    },
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWorkspaceRequest {
    #[validate(length(min = 1, max = 32, message = "name must be 1 to 32 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 1024, message = "description must be 1 to 1024 characters"))]
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    pub role: WorkspaceRole,
}

#[derive(Debug, Serialize)]
pub struct WorkspaceDetail {
    #[serde(flatten)]
    pub workspace: Workspace,
    pub role: WorkspaceRole,
    pub members: Vec<WorkspaceMember>,
}

/// `POST /create`; the creator becomes admin
pub async fn create_workspace(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(req): ValidJson<CreateWorkspaceRequest>,
) -> ApiResult<ApiResponse<Workspace>> {
    let workspace = Workspace::create_with_owner(
        &state.db,
        CreateWorkspace {
            owner_id: user.id,
            name: req.name,
            description: req.description,
        },
    )
    .await?;

    tracing::info!(workspace_id = %workspace.id, user_id = %user.id, "workspace created");
    Ok(ApiResponse::created("workspace created successfully", workspace))
}

pub async fn list_workspaces(
    State(state): State<AppState>,
    user: CurrentUser,
    Pagination(page): Pagination,
) -> ApiResult<ApiResponse<Vec<Workspace>>> {
    let workspaces = Workspace::list_for_member(&state.db, user.id, &page).await?;
    Ok(ApiResponse::ok("workspaces fetched successfully", workspaces))
}

pub async fn get_workspace(
    State(state): State<AppState>,
    Extension(access): Extension<WorkspaceAccess>,
) -> ApiResult<ApiResponse<WorkspaceDetail>> {
    let workspace = Workspace::find_by_id(&state.db, access.workspace_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("workspace not found".to_string()))?;

    let members = WorkspaceMember::list_by_workspace(&state.db, workspace.id).await?;

    Ok(ApiResponse::ok(
        "workspace fetched successfully",
        WorkspaceDetail {
            workspace,
            role: access.role,
            members,
        },
    ))
}

/// `PUT /:workspace_id/members/:user_id/role`
///
/// An admin cannot change their own role, so a workspace always keeps the
/// admin who last managed it.
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(access): Extension<WorkspaceAccess>,
    user: CurrentUser,
    Path(params): Path<HashMap<String, String>>,
    ValidJson(req): ValidJson<UpdateRoleRequest>,
) -> ApiResult<ApiResponse<WorkspaceMember>> {
    let member_id = path_id(&params, "user_id")?;

    if member_id == user.id {
        return Err(ApiError::BadRequest("you cannot change your own role".to_string()));
    }

    let member = WorkspaceMember::update_role(&state.db, access.workspace_id, member_id, req.role)
        .await?
        .ok_or_else(|| ApiError::NotFound("workspace member not found".to_string()))?;

    tracing::info!(
        workspace_id = %access.workspace_id,
        member_id = %member_id,
        role = %req.role,
        "workspace role changed"
    );

    Ok(ApiResponse::ok("member role updated successfully", member))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_workspace_validation() {
        let req = CreateWorkspaceRequest {
            name: "Platform".to_string(),
            description: String::new(),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("description"));

        let req = CreateWorkspaceRequest {
            name: "x".repeat(33),
            description: "Core services".to_string(),
        };
        assert!(req.validate().unwrap_err().field_errors().contains_key("name"));
    }

    #[test]
    fn test_role_request_rejects_board_roles() {
        assert!(serde_json::from_str::<UpdateRoleRequest>(r#"{"role":"observer"}"#).is_err());

        let req: UpdateRoleRequest = serde_json::from_str(r#"{"role":"manager"}"#).unwrap();
        assert_eq!(req.role, WorkspaceRole::Manager);
    }
}
