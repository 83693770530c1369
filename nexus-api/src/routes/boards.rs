/// Board endpoints
///
/// Role checks happen in the board guard; handlers read the resolved
/// [`BoardAccess`] from the request extensions.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Pagination, TokenParam, ValidJson},
    middleware::access::path_id,
    response::ApiResponse,
    validation,
};
use axum::{
    extract::{Path, State},
    Extension,
};
use chrono::Utc;
use nexus_shared::{
    auth::{
        authorization::BoardAccess,
        invitation::{accept_invitation, create_invitation, Invitee},
        middleware::CurrentUser,
        roles::BoardRole,
    },
    models::{
        board::{Board, CreateBoard, UpdateBoard},
        board_invitation::BoardInvitation,
        board_member::BoardMember,
        card::Card,
        list::List,
        user::normalize_email,
    },
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBoardRequest {
    #[validate(length(min = 1, max = 20, message = "name must be 1 to 20 characters"))]
    pub name: String,

    #[validate(custom(function = "validation::color_or_url"))]
    pub background: String,

    #[validate(custom(function = "validation::board_visibility"))]
    pub visibility: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBoardRequest {
    #[validate(length(min = 1, max = 20, message = "name must be 1 to 20 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 1000, message = "description must be at most 1000 characters"))]
    pub description: Option<String>,

    #[validate(custom(function = "validation::board_visibility"))]
    pub visibility: Option<String>,

    #[validate(custom(function = "validation::color_or_url"))]
    pub background: Option<String>,

    pub archived: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,

    /// `member` or `observer`
    pub role: BoardRole,
}

/// Board with the caller's role, its lists and their cards
#[derive(Debug, Serialize)]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,
    pub role: BoardRole,
    pub lists: Vec<List>,
    pub cards: Vec<Card>,
    pub members: Vec<BoardMember>,
}

#[derive(Debug, Serialize)]
pub struct AcceptedInvitation {
    pub board_id: Uuid,
    pub role: BoardRole,
}

/// `POST /create`
///
/// The creator becomes the board's admin.
pub async fn create_board(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(req): ValidJson<CreateBoardRequest>,
) -> ApiResult<ApiResponse<Board>> {
    let board = Board::create_with_owner(
        &state.db,
        CreateBoard {
            owner_id: user.id,
            name: req.name,
            background: req.background,
            visibility: req.visibility,
        },
    )
    .await?;

    tracing::info!(board_id = %board.id, user_id = %user.id, "board created");
    Ok(ApiResponse::created("board created successfully", board))
}

/// `GET /list`
pub async fn list_boards(
    State(state): State<AppState>,
    user: CurrentUser,
    Pagination(page): Pagination,
) -> ApiResult<ApiResponse<Vec<Board>>> {
    let boards = Board::list_for_member(&state.db, user.id, &page).await?;
    Ok(ApiResponse::ok("boards fetched successfully", boards))
}

/// `GET /:board_id`
pub async fn get_board(
    State(state): State<AppState>,
    Extension(access): Extension<BoardAccess>,
) -> ApiResult<ApiResponse<BoardDetail>> {
    let board = Board::find_by_id(&state.db, access.board_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("board not found".to_string()))?;

    let lists = List::list_by_board(&state.db, board.id).await?;
    let cards = Card::list_by_board(&state.db, board.id).await?;
    let members = BoardMember::list_by_board(&state.db, board.id).await?;

    Ok(ApiResponse::ok(
        "board fetched successfully",
        BoardDetail {
            board,
            role: access.role,
            lists,
            cards,
            members,
        },
    ))
}

/// `PUT /:board_id/update`
pub async fn update_board(
    State(state): State<AppState>,
    Extension(access): Extension<BoardAccess>,
    ValidJson(req): ValidJson<UpdateBoardRequest>,
) -> ApiResult<ApiResponse<Board>> {
    let board = Board::update(
        &state.db,
        access.board_id,
        UpdateBoard {
            name: req.name,
            description: req.description,
            visibility: req.visibility,
            background: req.background,
            archived: req.archived,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("board not found".to_string()))?;

    Ok(ApiResponse::ok("board updated successfully", board))
}

/// `DELETE /:board_id/delete`
pub async fn delete_board(
    State(state): State<AppState>,
    Extension(access): Extension<BoardAccess>,
) -> ApiResult<ApiResponse<()>> {
    if !Board::delete(&state.db, access.board_id).await? {
        return Err(ApiError::NotFound("board not found".to_string()));
    }

    tracing::info!(board_id = %access.board_id, "board deleted");
    Ok(ApiResponse::message("board deleted successfully"))
}

/// `POST /:board_id/invite`
///
/// Emails a one-time join link valid for 48 hours. A mail failure fails
/// the request; the pending invitation stays and can be re-sent.
pub async fn invite_to_board(
    State(state): State<AppState>,
    Extension(access): Extension<BoardAccess>,
    user: CurrentUser,
    ValidJson(req): ValidJson<InviteRequest>,
) -> ApiResult<ApiResponse<BoardInvitation>> {
    let email = normalize_email(&req.email);

    let issued = create_invitation(
        state.store.as_ref(),
        access.board_id,
        user.id,
        &email,
        req.role,
        Utc::now(),
    )
    .await?;

    let inviter = user.username.as_deref().unwrap_or(&user.email);
    let link = state.config.frontend_link("/join", &issued.raw_token);
    state
        .mailer
        .send_board_invitation(&email, inviter, &access.board_name, &link)
        .await?;

    Ok(ApiResponse::created(
        "invitation sent successfully",
        issued.invitation,
    ))
}

/// `POST /:board_id/accept-invite?token=`
///
/// Open to any authenticated user; the invitation itself decides who may
/// accept it.
pub async fn accept_invite(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    user: CurrentUser,
    TokenParam(token): TokenParam,
) -> ApiResult<ApiResponse<AcceptedInvitation>> {
    let board_id = path_id(&params, "board_id")?;

    let (invitation, role) = accept_invitation(
        state.store.as_ref(),
        &token,
        board_id,
        Invitee {
            user_id: user.id,
            email: &user.email,
        },
        Utc::now(),
    )
    .await?;

    Ok(ApiResponse::ok(
        "invitation accepted successfully",
        AcceptedInvitation {
            board_id: invitation.board_id,
            role,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_board_validation() {
        let req: CreateBoardRequest = serde_json::from_str(
            r##"{"name":"Roadmap","background":"#1e90ff","visibility":"team"}"##,
        )
        .unwrap();
        assert!(req.validate().is_ok());

        let req: CreateBoardRequest = serde_json::from_str(
            r#"{"name":"a name that is far too long","background":"blue","visibility":"secret"}"#,
        )
        .unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("background"));
        assert!(fields.contains_key("visibility"));
    }

    #[test]
    fn test_invite_role_must_be_known() {
        assert!(serde_json::from_str::<InviteRequest>(r#"{"email":"a@x.com","role":"owner"}"#)
            .is_err());

        let req: InviteRequest =
            serde_json::from_str(r#"{"email":"a@x.com","role":"observer"}"#).unwrap();
        assert_eq!(req.role, BoardRole::Observer);
    }
}
