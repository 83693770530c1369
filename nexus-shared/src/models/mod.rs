/// Database models for Nexus
///
/// One module per table. Each model carries its own CRUD operations as
/// associated functions taking a `&PgPool`; writes that must land together
/// run inside a single transaction.
///
/// # Models
///
/// - `user`: User accounts, credentials and refresh-token digests
/// - `account`: External OAuth identities linked to users
/// - `token`: Email-verification and password-reset token digests
/// - `board`, `board_member`, `board_invitation`: Boards and their access
/// - `list`, `card`: Ordered lists on a board and the cards on them
/// - `workspace`, `workspace_member`: Workspaces and their access
/// - `project`, `task`: Projects inside a workspace and their tasks
///
/// # Example
///
/// ```no_run
/// use nexus_shared::models::user::{User, CreateUser};
/// use nexus_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     username: Some("ada".to_string()),
///     email: "ada@example.com".to_string(),
///     password_hash: Some("$argon2id$...".to_string()),
/// }).await?;
/// # Ok(())
/// # }
/// ```

use serde::Deserialize;

pub mod account;
pub mod board;
pub mod board_invitation;
pub mod board_member;
pub mod card;
pub mod list;
pub mod project;
pub mod task;
pub mod token;
pub mod user;
pub mod workspace;
pub mod workspace_member;

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Highest page number honoured; larger requests read this page
pub const MAX_PAGE: i64 = 1_000_000;

/// Column a listing may be ordered by
///
/// Only these names ever reach an `ORDER BY` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Name => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Page and ordering of a list query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: i64,

    /// Rows per page, within `1..=MAX_PAGE_SIZE`
    pub size: i64,

    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl PageRequest {
    /// Builds a page request, falling back to defaults and clamping page and
    /// size
    pub fn new(
        page: Option<i64>,
        size: Option<i64>,
        sort_by: Option<SortField>,
        sort_order: Option<SortOrder>,
    ) -> Self {
        Self {
            page: page.filter(|p| *p >= 1).unwrap_or(1).min(MAX_PAGE),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            sort_by: sort_by.unwrap_or_default(),
            sort_order: sort_order.unwrap_or_default(),
        }
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.size)
    }

    /// `ORDER BY` clause body for a table alias, e.g. `b.created_at DESC`
    pub fn order_by(&self, alias: &str) -> String {
        format!(
            "{}.{} {}",
            alias,
            self.sort_by.column(),
            self.sort_order.keyword()
        )
    }
}
