/// Task endpoints under `/projects/:project_id/tasks`
///
/// Members create, read and edit tasks; assigning and deleting needs
/// `manager`. An assignee must be a member of the project's workspace.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidJson,
    middleware::access::path_id,
    response::ApiResponse,
};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Extension,
};
use chrono::{DateTime, Utc};
use nexus_shared::{
    auth::{
        authorization::{require_workspace_role, AuthzError, ProjectAccess},
        middleware::CurrentUser,
        roles::WorkspaceRole,
    },
    models::{
        task::{
            CreateTask, Task, TaskDetail, TaskPriority, TaskQuery, TaskSortField, TaskStatus,
            UpdateTask,
        },
        PageRequest, SortOrder,
    },
};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "title must be 1 to 255 characters"))]
    pub title: String,

    #[validate(length(max = 1024, message = "description must be at most 1024 characters"))]
    #[serde(default)]
    pub description: String,

    pub priority: TaskPriority,

    #[serde(default, alias = "dueDate")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default, alias = "assignedTo")]
    pub assigned_to: Option<Uuid>,

    #[validate(length(max = 50, message = "at most 50 dependencies"))]
    #[serde(default, alias = "dependsOn")]
    pub depends_on: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "title must be 1 to 255 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 1024, message = "description must be at most 1024 characters"))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    #[serde(default, alias = "dueDate")]
    pub due_date: Option<DateTime<Utc>>,
}

/// `null` or a missing field clears the assignee
#[derive(Debug, Deserialize, Validate)]
pub struct AssignTaskRequest {
    #[serde(default, alias = "assignedTo")]
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort_by: Option<TaskSortField>,
    pub sort_order: Option<SortOrder>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
}

impl From<TaskListQuery> for TaskQuery {
    fn from(query: TaskListQuery) -> Self {
        TaskQuery {
            status: query.status,
            priority: query.priority,
            assigned_to: query.assigned_to,
            sort_by: query.sort_by.unwrap_or_default(),
            sort_order: query.sort_order.unwrap_or_default(),
            page: PageRequest::new(query.page, query.size, None, None),
        }
    }
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("task not found".to_string())
}

/// Rejects an assignee outside the project's workspace
///
/// Runs against the access store, so no task row is touched on failure.
async fn check_assignee(
    state: &AppState,
    access: &ProjectAccess,
    assignee: Option<Uuid>,
) -> Result<(), ApiError> {
    let Some(user_id) = assignee else {
        return Ok(());
    };

    match require_workspace_role(&*state.store, access.workspace_id, user_id, WorkspaceRole::Member)
        .await
    {
        Ok(_) => Ok(()),
        Err(AuthzError::NotMember(_) | AuthzError::InsufficientRole { .. }) => Err(
            ApiError::BadRequest("assignee is not a member of this workspace".to_string()),
        ),
        Err(e) => Err(e.into()),
    }
}

/// `POST /projects/:project_id/tasks/create` (member)
pub async fn create_task(
    State(state): State<AppState>,
    Extension(access): Extension<ProjectAccess>,
    user: CurrentUser,
    ValidJson(req): ValidJson<CreateTaskRequest>,
) -> ApiResult<ApiResponse<TaskDetail>> {
    check_assignee(&state, &access, req.assigned_to).await?;

    let task = Task::create(
        &state.db,
        CreateTask {
            project_id: access.project_id,
            created_by: user.id,
            title: req.title,
            description: req.description,
            priority: req.priority,
            due_date: req.due_date,
            assigned_to: req.assigned_to,
            depends_on: req.depends_on,
        },
    )
    .await?
    .ok_or_else(|| {
        ApiError::BadRequest("dependencies must be tasks of this project".to_string())
    })?;

    tracing::info!(
        project_id = %access.project_id,
        task_id = %task.task.id,
        "task created"
    );
    Ok(ApiResponse::created("task created successfully", task))
}

/// `GET /projects/:project_id/tasks/list` (member)
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(access): Extension<ProjectAccess>,
    query: Result<Query<TaskListQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<Task>>> {
    let Query(query) = query.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "invalid task query");
        ApiError::BadRequest("invalid query parameters".to_string())
    })?;

    let tasks = Task::list_by_project(&state.db, access.project_id, &query.into()).await?;
    Ok(ApiResponse::ok("tasks fetched successfully", tasks))
}

/// `GET /projects/:project_id/tasks/:task_id` (member)
pub async fn get_task(
    State(state): State<AppState>,
    Extension(access): Extension<ProjectAccess>,
    Path(params): Path<HashMap<String, String>>,
) -> ApiResult<ApiResponse<TaskDetail>> {
    let task_id = path_id(&params, "task_id")?;

    let task = Task::find(&state.db, access.project_id, task_id)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(ApiResponse::ok("task fetched successfully", task))
}

/// `PUT /projects/:project_id/tasks/:task_id/update` (member)
pub async fn update_task(
    State(state): State<AppState>,
    Extension(access): Extension<ProjectAccess>,
    Path(params): Path<HashMap<String, String>>,
    ValidJson(req): ValidJson<UpdateTaskRequest>,
) -> ApiResult<ApiResponse<Task>> {
    let task_id = path_id(&params, "task_id")?;

    let task = Task::update(
        &state.db,
        access.project_id,
        task_id,
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
        },
    )
    .await?
    .ok_or_else(task_not_found)?;

    Ok(ApiResponse::ok("task updated successfully", task))
}

/// `PUT /projects/:project_id/tasks/:task_id/assign` (manager)
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(access): Extension<ProjectAccess>,
    Path(params): Path<HashMap<String, String>>,
    ValidJson(req): ValidJson<AssignTaskRequest>,
) -> ApiResult<ApiResponse<Task>> {
    let task_id = path_id(&params, "task_id")?;
    check_assignee(&state, &access, req.assigned_to).await?;

    let task = Task::assign(&state.db, access.project_id, task_id, req.assigned_to)
        .await?
        .ok_or_else(task_not_found)?;

    tracing::info!(task_id = %task.id, assigned_to = ?task.assigned_to, "task assigned");
    Ok(ApiResponse::ok("task assigned successfully", task))
}

/// `DELETE /projects/:project_id/tasks/:task_id/delete` (manager)
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(access): Extension<ProjectAccess>,
    Path(params): Path<HashMap<String, String>>,
) -> ApiResult<ApiResponse<()>> {
    let task_id = path_id(&params, "task_id")?;

    if !Task::delete(&state.db, access.project_id, task_id).await? {
        return Err(task_not_found());
    }

    tracing::info!(project_id = %access.project_id, task_id = %task_id, "task deleted");
    Ok(ApiResponse::message("task deleted successfully"))
}
