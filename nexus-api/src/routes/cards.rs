/// Card endpoints, nested under a board's list
///
/// Reading a card needs `observer` on the board; creating, editing and
/// deleting need `member`. The list in the path must belong to the board and
/// the card to the list, otherwise the answer is 404.

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
use chrono::{DateTime, Utc};
use nexus_shared::{
    auth::{authorization::BoardAccess, middleware::CurrentUser},
    models::card::{Card, CreateCard, UpdateCard},
};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCardRequest {
    #[validate(length(min = 1, max = 255, message = "title must be 1 to 255 characters"))]
    pub title: String,

    /// Defaults to the end of the list
    pub position: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCardRequest {
    #[validate(length(min = 1, max = 255, message = "title must be 1 to 255 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 4096, message = "description must be at most 4096 characters"))]
    pub description: Option<String>,

    pub position: Option<f64>,

    #[validate(custom(function = "validation::color_or_url"))]
    pub cover: Option<String>,

    pub archived: Option<bool>,
    pub completed: Option<bool>,

    #[serde(alias = "startDate")]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(alias = "dueDate")]
    pub due_date: Option<DateTime<Utc>>,
}

impl UpdateCardRequest {
    /// Only compares dates sent together in one request
    fn dates_in_order(&self) -> bool {
        match (self.start_date, self.due_date) {
            (Some(start), Some(due)) => due >= start,
            _ => true,
        }
    }
}

fn check_position(position: Option<f64>) -> Result<(), ApiError> {
    match position {
        Some(p) if !p.is_finite() => Err(ApiError::BadRequest(
            "position must be a finite number".to_string(),
        )),
        _ => Ok(()),
    }
}

fn card_not_found() -> ApiError {
    ApiError::NotFound("card not found".to_string())
}

fn ids(params: &HashMap<String, String>) -> Result<(Uuid, Uuid), ApiError> {
    Ok((path_id(params, "list_id")?, path_id(params, "card_id")?))
}

/// `POST /:board_id/lists/:list_id/cards/create`
pub async fn create_card(
    State(state): State<AppState>,
    Extension(access): Extension<BoardAccess>,
    Path(params): Path<HashMap<String, String>>,
    user: CurrentUser,
    ValidJson(req): ValidJson<CreateCardRequest>,
) -> ApiResult<ApiResponse<Card>> {
    let list_id = path_id(&params, "list_id")?;
    check_position(req.position)?;

    let card = Card::create(
        &state.db,
        CreateCard {
            board_id: access.board_id,
            list_id,
            created_by: user.id,
            title: req.title,
            position: req.position,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("list not found".to_string()))?;

    tracing::debug!(board_id = %access.board_id, card_id = %card.id, "card created");
    Ok(ApiResponse::created("card created successfully", card))
}

/// `GET /:board_id/lists/:list_id/cards/:card_id`
pub async fn get_card(
    State(state): State<AppState>,
    Extension(access): Extension<BoardAccess>,
    Path(params): Path<HashMap<String, String>>,
) -> ApiResult<ApiResponse<Card>> {
    let (list_id, card_id) = ids(&params)?;

    let card = Card::find(&state.db, access.board_id, list_id, card_id)
        .await?
        .ok_or_else(card_not_found)?;

    Ok(ApiResponse::ok("card details fetched successfully", card))
}

/// `PUT /:board_id/lists/:list_id/cards/:card_id/update`
pub async fn update_card(
    State(state): State<AppState>,
    Extension(access): Extension<BoardAccess>,
    Path(params): Path<HashMap<String, String>>,
    ValidJson(req): ValidJson<UpdateCardRequest>,
) -> ApiResult<ApiResponse<Card>> {
    let (list_id, card_id) = ids(&params)?;
    check_position(req.position)?;

    if !req.dates_in_order() {
        return Err(ApiError::BadRequest(
            "due date must not be before the start date".to_string(),
        ));
    }

    let card = Card::update(
        &state.db,
        access.board_id,
        list_id,
        card_id,
        UpdateCard {
            title: req.title,
            description: req.description,
            position: req.position,
            cover: req.cover,
            archived: req.archived,
            completed: req.completed,
            start_date: req.start_date,
            due_date: req.due_date,
        },
    )
    .await?
    .ok_or_else(card_not_found)?;

    Ok(ApiResponse::ok("card updated successfully", card))
}

/// `DELETE /:board_id/lists/:list_id/cards/:card_id/delete`
pub async fn delete_card(
    State(state): State<AppState>,
    Extension(access): Extension<BoardAccess>,
    Path(params): Path<HashMap<String, String>>,
) -> ApiResult<ApiResponse<()>> {
    let (list_id, card_id) = ids(&params)?;

    if !Card::delete(&state.db, access.board_id, list_id, card_id).await? {
        return Err(card_not_found());
    }

    tracing::debug!(board_id = %access.board_id, card_id = %card_id, "card deleted");
    Ok(ApiResponse::message("card deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_card_validation() {
        let req: CreateCardRequest = serde_json::from_str(r#"{"title":"Write docs"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.position.is_none());

        let req: CreateCardRequest = serde_json::from_str(r#"{"title":""}"#).unwrap();
        assert!(req.validate().unwrap_err().field_errors().contains_key("title"));
    }

    #[test]
    fn test_update_card_accepts_camel_case_dates() {
        let req: UpdateCardRequest = serde_json::from_str(
            r#"{"startDate":"2025-01-01T00:00:00Z","dueDate":"2025-01-03T00:00:00Z"}"#,
        )
        .unwrap();

        assert!(req.validate().is_ok());
        assert!(req.dates_in_order());
    }

    #[test]
    fn test_update_card_rejects_due_before_start() {
        let req: UpdateCardRequest = serde_json::from_str(
            r#"{"start_date":"2025-01-03T00:00:00Z","due_date":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert!(req.validate().is_ok());
        assert!(!req.dates_in_order());
    }

    #[test]
    fn test_position_must_be_finite() {
        assert!(check_position(None).is_ok());
        assert!(check_position(Some(2.5)).is_ok());
        assert!(matches!(
            check_position(Some(f64::INFINITY)),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_update_card_checks_cover() {
        let req: UpdateCardRequest = serde_json::from_str(r#"{"cover":"sunset"}"#).unwrap();
        assert!(req.validate().unwrap_err().field_errors().contains_key("cover"));
    }
}
