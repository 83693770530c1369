/// Router tests for the board invitation lifecycle

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{access_token, TestApp, FRONTEND_URL};
use nexus_shared::{mailer::EmailKind, models::user::User};
use serde_json::json;
use uuid::Uuid;

struct Board {
    app: TestApp,
    board_id: Uuid,
    admin: User,
}

fn board_with_admin() -> Board {
    let app = TestApp::new();
    let board_id = app.store.add_board("Roadmap");
    let admin = app.user("admin@example.com");
    app.store.add_board_member(board_id, admin.id, "admin");

    Board {
        app,
        board_id,
        admin,
    }
}

impl Board {
    async fn invite(&self, email: &str, role: &str) -> (StatusCode, serde_json::Value) {
        self.app
            .send(
                Method::POST,
                &format!("/api/v1/boards/{}/invite", self.board_id),
                Some(&access_token(self.admin.id)),
                Some(json!({ "email": email, "role": role })),
            )
            .await
    }

    async fn accept(&self, board_id: Uuid, user: &User, token: &str) -> (StatusCode, serde_json::Value) {
        self.app
            .send(
                Method::POST,
                &format!("/api/v1/boards/{}/accept-invite?token={}", board_id, token),
                Some(&access_token(user.id)),
                None,
            )
            .await
    }

    fn last_invite_token(&self) -> String {
        self.app
            .mailer
            .last_token(EmailKind::BoardInvitation)
            .expect("invitation email sent")
    }
}

#[tokio::test]
async fn test_invite_then_accept_once() {
    let board = board_with_admin();
    let bob = board.app.user("bob@example.com");

    let (status, body) = board.invite("Bob@Example.com", "member").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["email"], "bob@example.com");
    assert_eq!(body["data"]["status"], "pending");
    assert!(body["data"].get("token_hash").is_none());

    let email = board.app.mailer.last(EmailKind::BoardInvitation).unwrap();
    assert_eq!(email.to, "bob@example.com");
    assert!(email.link.starts_with(&format!("{}/join?token=", FRONTEND_URL)));
    assert!(email.html.contains("Roadmap"));

    let token = board.last_invite_token();

    let (status, body) = board.accept(board.board_id, &bob, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "member");

    let members = board.app.store.board_members(board.board_id);
    assert!(members
        .iter()
        .any(|m| m.user_id == bob.id && m.role == "member"));

    let (status, _) = board.accept(board.board_id, &bob, &token).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(board.app.store.board_members(board.board_id).len(), 2);
}

#[tokio::test]
async fn test_observer_invitation_grants_observer() {
    let board = board_with_admin();
    let olive = board.app.user("olive@example.com");

    let (status, _) = board.invite("olive@example.com", "observer").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = board
        .accept(board.board_id, &olive, &board.last_invite_token())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "observer");
}

#[tokio::test]
async fn test_expired_invitation_writes_nothing() {
    let board = board_with_admin();
    let bob = board.app.user("bob@example.com");

    board.invite("bob@example.com", "member").await;
    let token = board.last_invite_token();

    let invitation = board.app.store.invitations().remove(0);
    board
        .app
        .store
        .set_invitation_expiry(invitation.id, Utc::now() - Duration::minutes(1));

    let (status, body) = board.accept(board.board_id, &bob, &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invitation has expired");
    assert_eq!(board.app.store.board_members(board.board_id).len(), 1);
}

#[tokio::test]
async fn test_invitation_for_another_email_is_forbidden() {
    let board = board_with_admin();
    let mallory = board.app.user("mallory@example.com");

    board.invite("bob@example.com", "member").await;
    let token = board.last_invite_token();

    let (status, _) = board.accept(board.board_id, &mallory, &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(board.app.store.board_members(board.board_id).len(), 1);
    assert_eq!(board.app.store.invitations()[0].status, "pending");
}

#[tokio::test]
async fn test_token_from_another_board_is_not_found() {
    let board = board_with_admin();
    let bob = board.app.user("bob@example.com");
    let other_board = board.app.store.add_board("Other");

    board.invite("bob@example.com", "member").await;
    let token = board.last_invite_token();

    let (status, _) = board.accept(other_board, &bob, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(board.app.store.board_members(other_board).is_empty());
}

#[tokio::test]
async fn test_unknown_or_missing_token() {
    let board = board_with_admin();
    let bob = board.app.user("bob@example.com");

    let (status, _) = board.accept(board.board_id, &bob, "no-such-token").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = board
        .app
        .send(
            Method::POST,
            &format!("/api/v1/boards/{}/accept-invite", board.board_id),
            Some(&access_token(bob.id)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "token is required");
}

#[tokio::test]
async fn test_admin_role_cannot_be_invited() {
    let board = board_with_admin();

    let (status, _) = board.invite("bob@example.com", "admin").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(board.app.store.invitations().is_empty());
    assert!(board.app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_existing_member_cannot_be_invited() {
    let board = board_with_admin();
    let bob = board.app.user("bob@example.com");
    board.app.store.add_board_member(board.board_id, bob.id, "observer");

    let (status, _) = board.invite("bob@example.com", "member").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(board.app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_second_pending_invitation_conflicts_after_joining() {
    let board = board_with_admin();
    let bob = board.app.user("bob@example.com");

    board.invite("bob@example.com", "member").await;
    let first = board.last_invite_token();
    board.invite("bob@example.com", "observer").await;
    let second = board.last_invite_token();
    assert_ne!(first, second);

    let (status, _) = board.accept(board.board_id, &bob, &first).await;
    assert_eq!(status, StatusCode::OK);

    for _ in 0..2 {
        let (status, body) = board.accept(board.board_id, &bob, &second).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "user is already a member of this board");
    }

    let members = board.app.store.board_members(board.board_id);
    assert_eq!(members.len(), 2);
    assert!(members
        .iter()
        .any(|m| m.user_id == bob.id && m.role == "member"));
}

#[tokio::test]
async fn test_invite_body_is_validated() {
    let board = board_with_admin();

    let (status, body) = board.invite("not-an-email", "member").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"][0]["field"], "email");

    let (status, _) = board
        .app
        .send(
            Method::POST,
            &format!("/api/v1/boards/{}/invite", board.board_id),
            Some(&access_token(board.admin.id)),
            Some(json!({ "email": "bob@example.com", "role": "owner" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
