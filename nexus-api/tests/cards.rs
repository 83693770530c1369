/// Router tests for the card endpoints
///
/// Every case here is decided by the board guard or by request checks that
/// run before the card table is read.

mod common;

use axum::http::{Method, StatusCode};
use common::{access_token, TestApp};
use serde_json::json;
use uuid::Uuid;

struct Board {
    app: TestApp,
    board_id: Uuid,
    list_id: Uuid,
}

fn board_with(role: &str, email: &str) -> (Board, String) {
    let app = TestApp::new();
    let board_id = app.store.add_board("Roadmap");
    let user = app.user(email);
    app.store.add_board_member(board_id, user.id, role);

    let board = Board {
        app,
        board_id,
        list_id: Uuid::new_v4(),
    };
    (board, access_token(user.id))
}

#[tokio::test]
async fn test_observer_cannot_create_card() {
    let (board, token) = board_with("observer", "observer@example.com");

    let (status, body) = board
        .app
        .send(
            Method::POST,
            &format!(
                "/api/v1/boards/{}/lists/{}/cards/create",
                board.board_id, board.list_id
            ),
            Some(&token),
            Some(json!({ "title": "Write docs" })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "insufficient permissions");
}

#[tokio::test]
async fn test_non_member_cannot_read_card() {
    let (board, _) = board_with("admin", "owner@example.com");
    let stranger = board.app.user("stranger@example.com");

    let (status, body) = board
        .app
        .send(
            Method::GET,
            &format!(
                "/api/v1/boards/{}/lists/{}/cards/{}",
                board.board_id,
                board.list_id,
                Uuid::new_v4()
            ),
            Some(&access_token(stranger.id)),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "you are not a member of this board");
}

#[tokio::test]
async fn test_card_routes_require_token() {
    let (board, _) = board_with("member", "member@example.com");

    let (status, _) = board
        .app
        .send(
            Method::POST,
            &format!(
                "/api/v1/boards/{}/lists/{}/cards/create",
                board.board_id, board.list_id
            ),
            None,
            Some(json!({ "title": "Write docs" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_card_title_is_rejected() {
    let (board, token) = board_with("member", "member@example.com");

    let (status, body) = board
        .app
        .send(
            Method::POST,
            &format!(
                "/api/v1/boards/{}/lists/{}/cards/create",
                board.board_id, board.list_id
            ),
            Some(&token),
            Some(json!({ "title": "" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"][0]["field"], "title");
}

#[tokio::test]
async fn test_invalid_list_id_is_bad_request() {
    let (board, token) = board_with("member", "member@example.com");

    let (status, body) = board
        .app
        .send(
            Method::POST,
            &format!("/api/v1/boards/{}/lists/not-a-list/cards/create", board.board_id),
            Some(&token),
            Some(json!({ "title": "Write docs" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invalid list_id");
}

#[tokio::test]
async fn test_due_date_before_start_is_rejected() {
    let (board, token) = board_with("member", "member@example.com");

    let (status, body) = board
        .app
        .send(
            Method::PUT,
            &format!(
                "/api/v1/boards/{}/lists/{}/cards/{}/update",
                board.board_id,
                board.list_id,
                Uuid::new_v4()
            ),
            Some(&token),
            Some(json!({
                "startDate": "2025-03-10T00:00:00Z",
                "dueDate": "2025-03-01T00:00:00Z"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "due date must not be before the start date");
}

#[tokio::test]
async fn test_observer_cannot_delete_card() {
    let (board, token) = board_with("observer", "observer@example.com");

    let (status, _) = board
        .app
        .send(
            Method::DELETE,
            &format!(
                "/api/v1/boards/{}/lists/{}/cards/{}/delete",
                board.board_id,
                board.list_id,
                Uuid::new_v4()
            ),
            Some(&token),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}
