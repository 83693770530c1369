/// Stored one-time tokens (email verification, password reset)
///
/// Only the SHA-256 digest of a token is persisted. `(user_id, scope)` is
/// unique: issuing a new token for the same purpose replaces the old row, so
/// the previous raw token stops resolving.
///
/// ```sql
/// CREATE TABLE tokens (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     token_hash TEXT NOT NULL UNIQUE,
///     scope TEXT NOT NULL,
///     expires_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (user_id, scope)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::auth::token::TokenScope;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Token {
    pub id: Uuid,
    pub user_id: Uuid,

    #[serde(skip_serializing)]
    pub token_hash: String,

    /// Stored scope name, see [`TokenScope`]
    pub scope: String,

    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Token {
    /// Parsed scope, `None` if the stored name is unknown
    pub fn scope(&self) -> Option<TokenScope> {
        TokenScope::parse(&self.scope)
    }

    /// A token is expired strictly after its expiry instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Inserts or replaces the token for `(user_id, scope)`
    pub async fn upsert(
        pool: &PgPool,
        user_id: Uuid,
        scope: TokenScope,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let token = sqlx::query_as::<_, Token>(
            r#"
            INSERT INTO tokens (user_id, token_hash, scope, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, scope)
            DO UPDATE SET token_hash = EXCLUDED.token_hash,
                          expires_at = EXCLUDED.expires_at,
                          created_at = NOW()
            RETURNING id, user_id, token_hash, scope, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(scope.as_str())
        .bind(expires_at)
        .fetch_one(pool)
        .await?;

        Ok(token)
    }

    pub async fn find_by_hash(pool: &PgPool, token_hash: &str) -> Result<Option<Self>, sqlx::Error> {
        let token = sqlx::query_as::<_, Token>(
            r#"
            SELECT id, user_id, token_hash, scope, expires_at, created_at
            FROM tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }

    /// Deletes a token, returning false if it was already gone
    pub async fn consume(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tokens WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
