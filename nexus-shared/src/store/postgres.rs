//! PostgreSQL-backed [`AccessStore`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::AccessStore;
use crate::auth::roles::BoardRole;
use crate::auth::token::TokenScope;
use crate::models::board_invitation::{AcceptOutcome, BoardInvitation, CreateInvitation};
use crate::models::board_member::{BoardMember, BoardMembership};
use crate::models::project::Project;
use crate::models::token::Token;
use crate::models::user::User;
use crate::models::workspace_member::WorkspaceMember;

/// Access store over a sqlx connection pool
#[derive(Debug, Clone)]
pub struct PgAccessStore {
    pool: PgPool,
}

impl PgAccessStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AccessStore for PgAccessStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        User::find_by_id(&self.pool, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        User::find_by_email(&self.pool, email).await
    }

    async fn find_board_member(
        &self,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<BoardMembership>, sqlx::Error> {
        BoardMember::find_membership(&self.pool, board_id, user_id).await
    }

    async fn is_board_member_email(
        &self,
        board_id: Uuid,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        BoardMember::is_member_email(&self.pool, board_id, email).await
    }

    async fn workspace_member_roles(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        WorkspaceMember::roles_for(&self.pool, workspace_id, user_id).await
    }

    async fn find_project_workspace(&self, project_id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
        Project::workspace_id_of(&self.pool, project_id).await
    }

    async fn create_invitation(
        &self,
        data: CreateInvitation,
    ) -> Result<BoardInvitation, sqlx::Error> {
        BoardInvitation::create(&self.pool, data).await
    }

    async fn find_invitation_by_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<BoardInvitation>, sqlx::Error> {
        BoardInvitation::find_by_token_hash(&self.pool, token_hash).await
    }

    async fn accept_invitation(
        &self,
        invitation_id: Uuid,
        board_id: Uuid,
        user_id: Uuid,
        role: BoardRole,
    ) -> Result<AcceptOutcome, sqlx::Error> {
        BoardInvitation::accept(&self.pool, invitation_id, board_id, user_id, role).await
    }

    async fn upsert_token(
        &self,
        user_id: Uuid,
        scope: TokenScope,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Token, sqlx::Error> {
        Token::upsert(&self.pool, user_id, scope, token_hash, expires_at).await
    }

    async fn find_token(&self, token_hash: &str) -> Result<Option<Token>, sqlx::Error> {
        Token::find_by_hash(&self.pool, token_hash).await
    }

    async fn reset_password(
        &self,
        token_id: Uuid,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        if !Token::consume(&mut tx, token_id).await? {
            return Err(sqlx::Error::RowNotFound);
        }
        User::update_password(&mut tx, user_id, password_hash).await?;

        tx.commit().await
    }

    async fn verify_email(&self, token_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        if !Token::consume(&mut tx, token_id).await? {
            return Err(sqlx::Error::RowNotFound);
        }
        User::mark_email_verified(&mut tx, user_id).await?;

        tx.commit().await
    }
}
