/// Board model and database operations
///
/// A board is created together with its first member: the creator, as
/// `admin`. Both inserts share one transaction so no board ever exists
/// without an admin.
///
/// # Example
///
/// ```no_run
/// use nexus_shared::models::board::{Board, CreateBoard};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner_id: Uuid) -> Result<(), sqlx::Error> {
/// let board = Board::create_with_owner(&pool, CreateBoard {
///     owner_id,
///     name: "Roadmap".to_string(),
///     background: "#FFFFFF".to_string(),
///     visibility: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::PageRequest;
use crate::auth::roles::{BoardRole, RoleHierarchy};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,

    /// Hex color or image URL
    pub background: String,

    /// `private`, `team` or `public`
    pub visibility: String,

    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateBoard {
    pub owner_id: Uuid,
    pub name: String,
    pub background: String,

    /// Defaults to `private`
    pub visibility: Option<String>,
}

/// Partial update; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateBoard {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<String>,
    pub background: Option<String>,
    pub archived: Option<bool>,
}

impl Board {
    /// Creates a board and makes the owner its admin
    pub async fn create_with_owner(pool: &PgPool, data: CreateBoard) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let board = sqlx::query_as::<_, Board>(
            r#"
            INSERT INTO boards (owner_id, name, background, visibility)
            VALUES ($1, $2, $3, COALESCE($4, 'private'))
            RETURNING id, owner_id, name, description, background, visibility,
                      archived, created_at, updated_at
            "#,
        )
        .bind(data.owner_id)
        .bind(&data.name)
        .bind(&data.background)
        .bind(data.visibility)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO board_members (board_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(board.id)
            .bind(data.owner_id)
            .bind(BoardRole::Admin.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(board)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let board = sqlx::query_as::<_, Board>(
            r#"
            SELECT id, owner_id, name, description, background, visibility,
                   archived, created_at, updated_at
            FROM boards
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(board)
    }

    /// Lists the boards a user is a member of
    pub async fn list_for_member(
        pool: &PgPool,
        user_id: Uuid,
        page: &PageRequest,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT b.id, b.owner_id, b.name, b.description, b.background, b.visibility,
                   b.archived, b.created_at, b.updated_at
            FROM boards b
            JOIN board_members m ON m.board_id = b.id
            WHERE m.user_id = $1
            ORDER BY {}
            LIMIT $2 OFFSET $3
            "#,
            page.order_by("b")
        );

        let boards = sqlx::query_as::<_, Board>(&query)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok(boards)
    }

    /// Applies a partial update, returning `None` if the board is gone
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateBoard,
    ) -> Result<Option<Self>, sqlx::Error> {
        let board = sqlx::query_as::<_, Board>(
            r#"
            UPDATE boards
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                visibility = COALESCE($4, visibility),
                background = COALESCE($5, background),
                archived = COALESCE($6, archived),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, owner_id, name, description, background, visibility,
                      archived, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.visibility)
        .bind(data.background)
        .bind(data.archived)
        .fetch_optional(pool)
        .await?;

        Ok(board)
    }

    /// Deletes a board; members, invitations and lists cascade
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
