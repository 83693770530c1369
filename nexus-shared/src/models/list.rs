/// Lists on a board
///
/// Lists are ordered by a floating `position` so a client can drop a list
/// between two others without renumbering. Every operation is scoped by
/// `board_id`; a list id from another board never matches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct List {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: String,
    pub position: f64,
    pub color: Option<String>,
    pub archived: bool,
    pub collapsed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateList {
    pub board_id: Uuid,
    pub name: String,
    pub position: f64,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateList {
    pub name: Option<String>,
    pub position: Option<f64>,
    pub color: Option<String>,
    pub archived: Option<bool>,
    pub collapsed: Option<bool>,
}

impl List {
    pub async fn create(pool: &PgPool, data: CreateList) -> Result<Self, sqlx::Error> {
        let list = sqlx::query_as::<_, List>(
            r#"
            INSERT INTO lists (board_id, name, position, color)
            VALUES ($1, $2, $3, $4)
            RETURNING id, board_id, name, position, color, archived, collapsed,
                      created_at, updated_at
            "#,
        )
        .bind(data.board_id)
        .bind(&data.name)
        .bind(data.position)
        .bind(data.color)
        .fetch_one(pool)
        .await?;

        Ok(list)
    }

    pub async fn list_by_board(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let lists = sqlx::query_as::<_, List>(
            r#"
            SELECT id, board_id, name, position, color, archived, collapsed,
                   created_at, updated_at
            FROM lists
            WHERE board_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        Ok(lists)
    }

    pub async fn update(
        pool: &PgPool,
        board_id: Uuid,
        id: Uuid,
        data: UpdateList,
    ) -> Result<Option<Self>, sqlx::Error> {
        let list = sqlx::query_as::<_, List>(
            r#"
            UPDATE lists
            SET name = COALESCE($3, name),
                position = COALESCE($4, position),
                color = COALESCE($5, color),
                archived = COALESCE($6, archived),
                collapsed = COALESCE($7, collapsed),
                updated_at = NOW()
            WHERE board_id = $1 AND id = $2
            RETURNING id, board_id, name, position, color, archived, collapsed,
                      created_at, updated_at
            "#,
        )
        .bind(board_id)
        .bind(id)
        .bind(data.name)
        .bind(data.position)
        .bind(data.color)
        .bind(data.archived)
        .bind(data.collapsed)
        .fetch_optional(pool)
        .await?;

        Ok(list)
    }

    pub async fn delete(pool: &PgPool, board_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM lists WHERE board_id = $1 AND id = $2")
            .bind(board_id)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
