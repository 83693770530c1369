/// User model and database operations
///
/// Users register with a password or arrive through an OAuth provider, in
/// which case `password_hash` stays empty and the identity lives in
/// `accounts`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(32),
///     email TEXT NOT NULL UNIQUE,
///     password_hash TEXT,
///     refresh_token_hash TEXT,
///     email_verified_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Emails are stored lowercased and trimmed.
///
/// # Example
///
/// ```no_run
/// use nexus_shared::models::user::{User, CreateUser};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     username: Some("ada".to_string()),
///     email: "Ada@Example.com".to_string(),
///     password_hash: Some("$argon2id$...".to_string()),
/// }).await?;
/// assert_eq!(user.email, "ada@example.com");
///
/// let found = User::find_by_email(&pool, "ADA@example.com").await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::auth::token::TokenScope;

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Display handle, absent for some OAuth sign-ups
    pub username: Option<String>,

    pub email: String,

    /// Argon2id PHC string. `None` for OAuth-only accounts.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// SHA-256 digest of the current refresh token, cleared on logout
    #[serde(skip_serializing)]
    pub refresh_token_hash: Option<String>,

    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: Option<String>,
    pub email: String,

    /// Argon2id hash, NOT the plaintext password
    pub password_hash: Option<String>,
}

/// Normalizes an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Whether the account can sign in with a password
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn is_email_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }

    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the email is taken
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::insert(&mut conn, data).await
    }

    /// Inserts a user on an existing connection or transaction
    pub async fn insert(conn: &mut PgConnection, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, refresh_token_hash,
                      email_verified_at, created_at, updated_at
            "#,
        )
        .bind(data.username)
        .bind(normalize_email(&data.email))
        .bind(data.password_hash)
        .fetch_one(conn)
        .await?;

        Ok(user)
    }

    /// Registers a user together with their first email-verification token
    ///
    /// Both rows are written in one transaction.
    pub async fn register(
        pool: &PgPool,
        data: CreateUser,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user = Self::insert(&mut tx, data).await?;

        sqlx::query(
            r#"
            INSERT INTO tokens (user_id, token_hash, scope, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.id)
        .bind(token_hash)
        .bind(TokenScope::EmailVerification.as_str())
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, refresh_token_hash,
                   email_verified_at, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::find_by_email_on(&mut conn, email).await
    }

    pub async fn find_by_email_on(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, refresh_token_hash,
                   email_verified_at, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(conn)
        .await?;

        Ok(user)
    }

    /// Stores or clears the refresh-token digest
    ///
    /// Returns false if the user doesn't exist.
    pub async fn set_refresh_token_hash(
        pool: &PgPool,
        id: Uuid,
        refresh_token_hash: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(refresh_token_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the password hash and signs the user out everywhere
    pub async fn update_password(
        conn: &mut PgConnection,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, refresh_token_hash = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks the email as verified, keeping the first verification time
    pub async fn mark_email_verified(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified_at = COALESCE(email_verified_at, NOW()), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
