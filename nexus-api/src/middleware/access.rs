/// Authentication and role-guard middleware
///
/// The chain for a protected route is:
///
/// ```text
/// authenticate ──> board_guard / workspace_guard / project_guard ──> handler
/// ```
///
/// [`authenticate`] resolves the bearer token into a
/// [`CurrentUser`] and stores it in the request extensions. The guards read
/// the scope id from the matched path, run the role check and store the
/// resolved access ([`BoardAccess`], [`WorkspaceAccess`] or
/// [`ProjectAccess`]) for the handler. Any failure ends the chain with the
/// error envelope.
///
/// Guards are attached with `route_layer` so they only run on matched routes:
///
/// ```no_run
/// use axum::{middleware::from_fn_with_state, routing::put, Router};
/// use nexus_api::app::AppState;
/// use nexus_api::middleware::access::{board_guard, RoleGuard};
/// use nexus_shared::auth::roles::BoardRole;
///
/// # async fn update() {}
/// fn admin_routes(state: &AppState) -> Router<AppState> {
///     Router::new()
///         .route("/:board_id/update", put(update))
///         .route_layer(from_fn_with_state(
///             RoleGuard::new(state, BoardRole::Admin),
///             board_guard,
///         ))
/// }
/// ```

use std::collections::HashMap;

use axum::{
    extract::{Path, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use nexus_shared::auth::{
    authorization::{
        require_board_role, require_project_role, require_workspace_role, BoardAccess,
        ProjectAccess, WorkspaceAccess,
    },
    middleware::{resolve_bearer, CurrentUser},
    roles::{BoardRole, WorkspaceRole},
};
use uuid::Uuid;

use crate::{app::AppState, error::ApiError};

/// Verifies the access token and attaches the [`CurrentUser`]
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let user = resolve_bearer(state.store.as_ref(), header.as_deref(), state.access_secret())
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "authentication failed");
            e
        })?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Middleware state for a role guard: the app state plus the minimum role
#[derive(Clone)]
pub struct RoleGuard<R> {
    pub state: AppState,
    pub required: R,
}

impl<R> RoleGuard<R> {
    pub fn new(state: &AppState, required: R) -> Self {
        Self {
            state: state.clone(),
            required,
        }
    }
}

pub(crate) fn path_id(params: &HashMap<String, String>, name: &str) -> Result<Uuid, ApiError> {
    let raw = params
        .get(name)
        .ok_or_else(|| ApiError::InternalError(format!("route has no :{} segment", name)))?;

    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("invalid {}", name)))
}

/// Requires at least `required` on the board named by `:board_id`
pub async fn board_guard(
    State(guard): State<RoleGuard<BoardRole>>,
    Path(params): Path<HashMap<String, String>>,
    user: CurrentUser,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let board_id = path_id(&params, "board_id")?;

    let access: BoardAccess =
        require_board_role(guard.state.store.as_ref(), board_id, user.id, guard.required).await?;

    req.extensions_mut().insert(access);
    Ok(next.run(req).await)
}

/// Requires at least `required` in the workspace named by `:workspace_id`
pub async fn workspace_guard(
    State(guard): State<RoleGuard<WorkspaceRole>>,
    Path(params): Path<HashMap<String, String>>,
    user: CurrentUser,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let workspace_id = path_id(&params, "workspace_id")?;

    let access: WorkspaceAccess = require_workspace_role(
        guard.state.store.as_ref(),
        workspace_id,
        user.id,
        guard.required,
    )
    .await?;

    req.extensions_mut().insert(access);
    Ok(next.run(req).await)
}

/// Requires at least `required` in the workspace owning `:project_id`
pub async fn project_guard(
    State(guard): State<RoleGuard<WorkspaceRole>>,
    Path(params): Path<HashMap<String, String>>,
    user: CurrentUser,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let project_id = path_id(&params, "project_id")?;

    let access: ProjectAccess = require_project_role(
        guard.state.store.as_ref(),
        project_id,
        user.id,
        guard.required,
    )
    .await?;

    req.extensions_mut().insert(access);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_id() {
        let id = Uuid::new_v4();
        let mut params = HashMap::new();
        params.insert("board_id".to_string(), id.to_string());
        params.insert("list_id".to_string(), "not-a-uuid".to_string());

        assert_eq!(path_id(&params, "board_id").unwrap(), id);
        assert!(matches!(
            path_id(&params, "list_id"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            path_id(&params, "workspace_id"),
            Err(ApiError::InternalError(_))
        ));
    }
}
