/// Tasks inside a project
///
/// Tasks are soft-deleted: [`Task::delete`] sets `deleted` and every read
/// skips deleted rows. A task may depend on other live tasks of the same
/// project; dependencies are written in the same transaction as the task.
///
/// ```sql
/// CREATE TABLE task_dependencies (
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     depends_on UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     PRIMARY KEY (task_id, depends_on)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{PageRequest, SortOrder};

/// Workflow state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    InReview,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::InReview => "in_review",
            TaskStatus::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

/// Column a task listing may be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSortField {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
}

impl TaskSortField {
    /// Sort expression over the `t` alias
    ///
    /// Priority sorts by rank rather than by name.
    fn expression(&self) -> &'static str {
        match self {
            TaskSortField::CreatedAt => "t.created_at",
            TaskSortField::DueDate => "t.due_date",
            TaskSortField::Priority => {
                "CASE t.priority WHEN 'low' THEN 1 WHEN 'medium' THEN 2 \
                 WHEN 'high' THEN 3 ELSE 4 END"
            }
        }
    }
}

/// Filters, ordering and page of a task listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub sort_by: TaskSortField,
    pub sort_order: SortOrder,
    pub page: PageRequest,
}

impl TaskQuery {
    /// `ORDER BY` body; tasks without a due date sort last either way
    pub fn order_by(&self) -> String {
        format!(
            "{} {} NULLS LAST, t.id",
            self.sort_by.expression(),
            self.sort_order.keyword()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task with the ids of the tasks it depends on
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub depends_on: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub depends_on: Vec<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
}

const TASK_COLUMNS: &str = "t.id, t.project_id, t.created_by, t.assigned_to, t.title, \
     t.description, t.status, t.priority, t.due_date, t.created_at, t.updated_at";

impl Task {
    /// Inserts a task in status `todo` together with its dependencies
    ///
    /// Returns `None`, with nothing written, if any dependency is not a live
    /// task of the same project.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Option<TaskDetail>, sqlx::Error> {
        let mut depends_on = data.depends_on;
        depends_on.sort_unstable();
        depends_on.dedup();

        let mut tx = pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO tasks AS t (project_id, created_by, assigned_to, title, description,
                                    priority, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(data.project_id)
            .bind(data.created_by)
            .bind(data.assigned_to)
            .bind(&data.title)
            .bind(&data.description)
            .bind(data.priority.as_str())
            .bind(data.due_date)
            .fetch_one(&mut *tx)
            .await?;

        if !depends_on.is_empty() {
            let inserted = sqlx::query(
                r#"
                INSERT INTO task_dependencies (task_id, depends_on)
                SELECT $1, d.id
                FROM tasks d
                WHERE d.id = ANY($2) AND d.project_id = $3 AND NOT d.deleted
                "#,
            )
            .bind(task.id)
            .bind(&depends_on)
            .bind(data.project_id)
            .execute(&mut *tx)
            .await?;

            if inserted.rows_affected() != depends_on.len() as u64 {
                tx.rollback().await?;
                return Ok(None);
            }
        }

        tx.commit().await?;

        Ok(Some(TaskDetail { task, depends_on }))
    }

    pub async fn find(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<Option<TaskDetail>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tasks t WHERE t.project_id = $1 AND t.id = $2 AND NOT t.deleted",
            TASK_COLUMNS
        );

        let Some(task) = sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .bind(id)
            .fetch_optional(pool)
            .await?
        else {
            return Ok(None);
        };

        let depends_on: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT td.depends_on
            FROM task_dependencies td
            JOIN tasks d ON d.id = td.depends_on
            WHERE td.task_id = $1 AND NOT d.deleted
            ORDER BY td.depends_on
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(Some(TaskDetail { task, depends_on }))
    }

    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
        filter: &TaskQuery,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM tasks t
            WHERE t.project_id = $1
              AND NOT t.deleted
              AND ($2::text IS NULL OR t.status = $2)
              AND ($3::text IS NULL OR t.priority = $3)
              AND ($4::uuid IS NULL OR t.assigned_to = $4)
            ORDER BY {}
            LIMIT $5 OFFSET $6
            "#,
            TASK_COLUMNS,
            filter.order_by()
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.priority.map(|p| p.as_str()))
            .bind(filter.assigned_to)
            .bind(filter.page.limit())
            .bind(filter.page.offset())
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks AS t
            SET title = COALESCE($3, t.title),
                description = COALESCE($4, t.description),
                status = COALESCE($5, t.status),
                priority = COALESCE($6, t.priority),
                due_date = COALESCE($7, t.due_date),
                updated_at = NOW()
            WHERE t.project_id = $1 AND t.id = $2 AND NOT t.deleted
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .bind(id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.status.map(|s| s.as_str()))
            .bind(data.priority.map(|p| p.as_str()))
            .bind(data.due_date)
            .fetch_optional(pool)
            .await
    }

    /// Sets or clears the assignee
    pub async fn assign(
        pool: &PgPool,
        project_id: Uuid,
        id: Uuid,
        assigned_to: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks AS t
            SET assigned_to = $3, updated_at = NOW()
            WHERE t.project_id = $1 AND t.id = $2 AND NOT t.deleted
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .bind(id)
            .bind(assigned_to)
            .fetch_optional(pool)
            .await
    }

    /// Soft delete; `false` if the task was missing or already deleted
    pub async fn delete(pool: &PgPool, project_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET deleted = TRUE, updated_at = NOW()
            WHERE project_id = $1 AND id = $2 AND NOT deleted
            "#,
        )
        .bind(project_id)
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
