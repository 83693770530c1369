/// List endpoints, nested under a board
///
/// All three require at least `member` on the board.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidJson,
    middleware::access::path_id,
    response::ApiResponse,
    validation,
};
use axum::{
    extract::{Path, State},
    Extension,
};
use nexus_shared::{
    auth::authorization::BoardAccess,
    models::list::{CreateList, List, UpdateList},
};
use serde::Deserialize;
use std::collections::HashMap;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateListRequest {
    #[validate(length(min = 1, max = 64, message = "name must be 1 to 64 characters"))]
    pub name: String,

    /// Fractional so a list can be moved between two others
    pub position: f64,

    #[validate(custom(function = "validation::hex_color"))]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateListRequest {
    #[validate(length(min = 1, max = 64, message = "name must be 1 to 64 characters"))]
    pub name: Option<String>,

    pub position: Option<f64>,

    #[validate(custom(function = "validation::hex_color"))]
    pub color: Option<String>,

    pub archived: Option<bool>,
    pub collapsed: Option<bool>,
}

/// `POST /:board_id/lists/create`
pub async fn create_list(
    State(state): State<AppState>,
    Extension(access): Extension<BoardAccess>,
    ValidJson(req): ValidJson<CreateListRequest>,
) -> ApiResult<ApiResponse<List>> {
    if !req.position.is_finite() {
        return Err(ApiError::BadRequest("position must be a finite number".to_string()));
    }

    let list = List::create(
        &state.db,
        CreateList {
            board_id: access.board_id,
            name: req.name,
            position: req.position,
            color: req.color,
        },
    )
    .await?;

    tracing::debug!(board_id = %access.board_id, list_id = %list.id, "list created");
    Ok(ApiResponse::created("list created successfully", list))
}

/// `PUT /:board_id/lists/:list_id/update`
pub async fn update_list(
    State(state): State<AppState>,
    Extension(access): Extension<BoardAccess>,
    Path(params): Path<HashMap<String, String>>,
    ValidJson(req): ValidJson<UpdateListRequest>,
) -> ApiResult<ApiResponse<List>> {
    let list_id = path_id(&params, "list_id")?;

    let list = List::update(
        &state.db,
        access.board_id,
        list_id,
        UpdateList {
            name: req.name,
            position: req.position.filter(|p| p.is_finite()),
            color: req.color,
            archived: req.archived,
            collapsed: req.collapsed,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("list not found".to_string()))?;

    Ok(ApiResponse::ok("list updated successfully", list))
}

/// `DELETE /:board_id/lists/:list_id/delete`
pub async fn delete_list(
    State(state): State<AppState>,
    Extension(access): Extension<BoardAccess>,
    Path(params): Path<HashMap<String, String>>,
) -> ApiResult<ApiResponse<()>> {
    let list_id = path_id(&params, "list_id")?;

    if !List::delete(&state.db, access.board_id, list_id).await? {
        return Err(ApiError::NotFound("list not found".to_string()));
    }

    Ok(ApiResponse::message("list deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_list_requires_position() {
        assert!(serde_json::from_str::<CreateListRequest>(r#"{"name":"Todo"}"#).is_err());

        let req: CreateListRequest =
            serde_json::from_str(r##"{"name":"Todo","position":1.5,"color":"#fff"}"##).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_list_checks_color() {
        let req: UpdateListRequest = serde_json::from_str(r#"{"color":"red"}"#).unwrap();
        assert!(req.validate().unwrap_err().field_errors().contains_key("color"));

        let req: UpdateListRequest = serde_json::from_str(r#"{"collapsed":true}"#).unwrap();
        assert!(req.validate().is_ok());
    }
}
