/// Board membership rows
///
/// `(board_id, user_id)` is the primary key, so a user holds one role per
/// board. The role is stored as text and parsed with
/// [`BoardRole`](crate::auth::roles::BoardRole) at check time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::auth::roles::{BoardRole, RoleHierarchy};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoardMember {
    pub board_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

/// A membership row joined with the board it grants access to
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoardMembership {
    pub board_id: Uuid,
    pub board_name: String,
    pub user_id: Uuid,
    pub role: String,
}

impl BoardMember {
    pub async fn insert(
        conn: &mut PgConnection,
        board_id: Uuid,
        user_id: Uuid,
        role: BoardRole,
    ) -> Result<Self, sqlx::Error> {
        let member = sqlx::query_as::<_, BoardMember>(
            r#"
            INSERT INTO board_members (board_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING board_id, user_id, role, joined_at
            "#,
        )
        .bind(board_id)
        .bind(user_id)
        .bind(role.as_str())
        .fetch_one(conn)
        .await?;

        Ok(member)
    }

    /// Looks up the caller's membership together with the board name
    pub async fn find_membership(
        pool: &PgPool,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<BoardMembership>, sqlx::Error> {
        let membership = sqlx::query_as::<_, BoardMembership>(
            r#"
            SELECT m.board_id, b.name AS board_name, m.user_id, m.role
            FROM board_members m
            JOIN boards b ON b.id = m.board_id
            WHERE m.board_id = $1 AND m.user_id = $2
            "#,
        )
        .bind(board_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Whether a user with this email already belongs to the board
    pub async fn is_member_email(
        pool: &PgPool,
        board_id: Uuid,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM board_members m
                JOIN users u ON u.id = m.user_id
                WHERE m.board_id = $1 AND u.email = $2
            )
            "#,
        )
        .bind(board_id)
        .bind(crate::models::user::normalize_email(email))
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    pub async fn list_by_board(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let members = sqlx::query_as::<_, BoardMember>(
            r#"
            SELECT board_id, user_id, role, joined_at
            FROM board_members
            WHERE board_id = $1
            ORDER BY joined_at ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }
}
