/// Access store: the persistence calls behind authentication,
/// authorization, one-time tokens and invitations
///
/// The authorization chain never touches SQL directly; it goes through
/// [`AccessStore`]. [`PgAccessStore`] backs it with PostgreSQL and
/// [`MemoryStore`] keeps everything in process for tests.
///
/// Errors are plain `sqlx::Error`; callers surface them as internal errors
/// without retrying.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use nexus_shared::store::{AccessStore, PgAccessStore};
/// use sqlx::PgPool;
///
/// # fn example(pool: PgPool) {
/// let store: Arc<dyn AccessStore> = Arc::new(PgAccessStore::new(pool));
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::roles::BoardRole;
use crate::auth::token::TokenScope;
use crate::models::board_invitation::{AcceptOutcome, BoardInvitation, CreateInvitation};
use crate::models::board_member::BoardMembership;
use crate::models::token::Token;
use crate::models::user::User;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgAccessStore;

#[async_trait]
pub trait AccessStore: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;

    /// The caller's membership row on a board, joined with the board name
    async fn find_board_member(
        &self,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<BoardMembership>, sqlx::Error>;

    /// Whether the user registered under `email` is already on the board
    async fn is_board_member_email(&self, board_id: Uuid, email: &str)
        -> Result<bool, sqlx::Error>;

    /// Every role string the user holds in the workspace
    async fn workspace_member_roles(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error>;

    /// Owning workspace of a project, `None` if the project doesn't exist
    async fn find_project_workspace(&self, project_id: Uuid) -> Result<Option<Uuid>, sqlx::Error>;

    async fn create_invitation(&self, data: CreateInvitation)
        -> Result<BoardInvitation, sqlx::Error>;

    async fn find_invitation_by_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<BoardInvitation>, sqlx::Error>;

    /// Flips a pending invitation to accepted and inserts the member
    ///
    /// Atomic. Nothing is written unless the outcome is `Accepted`.
    async fn accept_invitation(
        &self,
        invitation_id: Uuid,
        board_id: Uuid,
        user_id: Uuid,
        role: BoardRole,
    ) -> Result<AcceptOutcome, sqlx::Error>;

    /// Inserts or replaces the token held for `(user_id, scope)`
    async fn upsert_token(
        &self,
        user_id: Uuid,
        scope: TokenScope,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Token, sqlx::Error>;

    async fn find_token(&self, token_hash: &str) -> Result<Option<Token>, sqlx::Error>;

    /// Stores a new password hash, clears the refresh token and consumes the
    /// reset token, atomically
    async fn reset_password(
        &self,
        token_id: Uuid,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error>;

    /// Marks the email verified and consumes the verification token, atomically
    async fn verify_email(&self, token_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error>;
}
