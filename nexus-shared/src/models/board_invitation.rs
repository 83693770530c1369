/// Board invitations
///
/// An invitation moves `pending -> accepted` exactly once. Acceptance flips
/// the status and inserts the membership in one transaction; the status
/// update is conditional on the row still being `pending`, so two racing
/// acceptances cannot both insert a member.
///
/// ```sql
/// CREATE TABLE board_invitations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     email TEXT NOT NULL,
///     invited_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role TEXT NOT NULL,
///     token_hash TEXT NOT NULL UNIQUE,
///     status TEXT NOT NULL DEFAULT 'pending',
///     expires_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::board_member::BoardMember;
use crate::auth::roles::{BoardRole, RoleHierarchy};

/// Invitation state, stored as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
        }
    }

    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "pending" => Some(InvitationStatus::Pending),
            "accepted" => Some(InvitationStatus::Accepted),
            _ => None,
        }
    }
}

/// Result of the accept transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    Accepted,

    /// Another request accepted the invitation first
    NotPending,

    /// The user already holds a membership row on the board
    AlreadyMember,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoardInvitation {
    pub id: Uuid,
    pub board_id: Uuid,

    /// Invitee address, normalized
    pub email: String,

    pub invited_by: Uuid,

    /// Role granted on acceptance
    pub role: String,

    #[serde(skip_serializing)]
    pub token_hash: String,

    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateInvitation {
    pub board_id: Uuid,
    pub email: String,
    pub invited_by: Uuid,
    pub role: BoardRole,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl BoardInvitation {
    pub fn status(&self) -> Option<InvitationStatus> {
        InvitationStatus::parse(&self.status)
    }

    pub fn is_accepted(&self) -> bool {
        self.status() == Some(InvitationStatus::Accepted)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub async fn create(pool: &PgPool, data: CreateInvitation) -> Result<Self, sqlx::Error> {
        let invitation = sqlx::query_as::<_, BoardInvitation>(
            r#"
            INSERT INTO board_invitations (board_id, email, invited_by, role, token_hash, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, board_id, email, invited_by, role, token_hash, status,
                      expires_at, created_at
            "#,
        )
        .bind(data.board_id)
        .bind(crate::models::user::normalize_email(&data.email))
        .bind(data.invited_by)
        .bind(data.role.as_str())
        .bind(&data.token_hash)
        .bind(data.expires_at)
        .fetch_one(pool)
        .await?;

        Ok(invitation)
    }

    pub async fn find_by_token_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let invitation = sqlx::query_as::<_, BoardInvitation>(
            r#"
            SELECT id, board_id, email, invited_by, role, token_hash, status,
                   expires_at, created_at
            FROM board_invitations
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

        Ok(invitation)
    }

    /// Marks the invitation accepted and adds the member, atomically
    ///
    /// Writes nothing unless the outcome is [`AcceptOutcome::Accepted`]. A
    /// membership row that appeared after the caller's checks (a concurrent
    /// join) surfaces as the `board_members` primary key violation and is
    /// reported as [`AcceptOutcome::AlreadyMember`].
    pub async fn accept(
        pool: &PgPool,
        invitation_id: Uuid,
        board_id: Uuid,
        user_id: Uuid,
        role: BoardRole,
    ) -> Result<AcceptOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE board_invitations
            SET status = 'accepted'
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(invitation_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(AcceptOutcome::NotPending);
        }

        match BoardMember::insert(&mut tx, board_id, user_id, role).await {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tx.rollback().await?;
                return Ok(AcceptOutcome::AlreadyMember);
            }
            Err(e) => return Err(e),
        }

        tx.commit().await?;

        Ok(AcceptOutcome::Accepted)
    }
}
