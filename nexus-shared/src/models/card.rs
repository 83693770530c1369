/// Cards on a list
///
/// A card belongs to one list and, through it, one board. Every query is
/// scoped by `(board_id, list_id)` so a card id taken from another board or
/// list never matches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Card {
    pub id: Uuid,
    pub board_id: Uuid,
    pub list_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: f64,

    /// Cover image URL or color
    pub cover: Option<String>,

    pub archived: bool,
    pub completed: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCard {
    pub board_id: Uuid,
    pub list_id: Uuid,
    pub created_by: Uuid,
    pub title: String,

    /// `None` places the card after the last one in the list
    pub position: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCard {
    pub title: Option<String>,
    pub description: Option<String>,
    pub position: Option<f64>,
    pub cover: Option<String>,
    pub archived: Option<bool>,
    pub completed: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

const CARD_COLUMNS: &str = "id, board_id, list_id, created_by, title, description, position, \
     cover, archived, completed, start_date, due_date, created_at, updated_at";

impl Card {
    /// Inserts a card into a list of the board
    ///
    /// Returns `None` if the list doesn't exist on that board.
    pub async fn create(pool: &PgPool, data: CreateCard) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO cards (board_id, list_id, created_by, title, position)
            SELECT l.board_id, l.id, $3, $4,
                   COALESCE($5, (SELECT MAX(c.position) + 1 FROM cards c WHERE c.list_id = l.id), 1)
            FROM lists l
            WHERE l.board_id = $1 AND l.id = $2
            RETURNING {}
            "#,
            CARD_COLUMNS
        );

        let card = sqlx::query_as::<_, Card>(&query)
            .bind(data.board_id)
            .bind(data.list_id)
            .bind(data.created_by)
            .bind(&data.title)
            .bind(data.position)
            .fetch_optional(pool)
            .await?;

        Ok(card)
    }

    pub async fn find(
        pool: &PgPool,
        board_id: Uuid,
        list_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM cards WHERE board_id = $1 AND list_id = $2 AND id = $3",
            CARD_COLUMNS
        );

        sqlx::query_as::<_, Card>(&query)
            .bind(board_id)
            .bind(list_id)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Every card on a board, in list order then position
    pub async fn list_by_board(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM cards WHERE board_id = $1 ORDER BY list_id, position ASC",
            CARD_COLUMNS
        );

        sqlx::query_as::<_, Card>(&query)
            .bind(board_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        board_id: Uuid,
        list_id: Uuid,
        id: Uuid,
        data: UpdateCard,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE cards
            SET title = COALESCE($4, title),
                description = COALESCE($5, description),
                position = COALESCE($6, position),
                cover = COALESCE($7, cover),
                archived = COALESCE($8, archived),
                completed = COALESCE($9, completed),
                start_date = COALESCE($10, start_date),
                due_date = COALESCE($11, due_date),
                updated_at = NOW()
            WHERE board_id = $1 AND list_id = $2 AND id = $3
            RETURNING {}
            "#,
            CARD_COLUMNS
        );

        sqlx::query_as::<_, Card>(&query)
            .bind(board_id)
            .bind(list_id)
            .bind(id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.position)
            .bind(data.cover)
            .bind(data.archived)
            .bind(data.completed)
            .bind(data.start_date)
            .bind(data.due_date)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(
        pool: &PgPool,
        board_id: Uuid,
        list_id: Uuid,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM cards WHERE board_id = $1 AND list_id = $2 AND id = $3")
                .bind(board_id)
                .bind(list_id)
                .bind(id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
