/// External identity linked to a user (OAuth)
///
/// A user signing in through Google gets one `accounts` row keyed by
/// `(provider, provider_account_id)`. The first sign-in creates the user if
/// no account with that email exists yet, otherwise links to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::user::{CreateUser, User};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,

    /// Account kind, `oauth` for provider sign-ins
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub account_type: String,

    pub provider: String,
    pub provider_account_id: String,
    pub created_at: DateTime<Utc>,
}

/// Profile returned by an OAuth provider
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub provider: String,
    pub provider_account_id: String,
    pub email: String,
    pub username: Option<String>,
}

impl Account {
    pub async fn find_by_provider(
        pool: &PgPool,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, user_id, type, provider, provider_account_id, created_at
            FROM accounts
            WHERE provider = $1 AND provider_account_id = $2
            "#,
        )
        .bind(provider)
        .bind(provider_account_id)
        .fetch_optional(pool)
        .await?;

        Ok(account)
    }

    /// Resolves the user behind an OAuth profile, creating rows as needed
    ///
    /// Runs in one transaction:
    /// 1. find or create the user by email (OAuth users have no password),
    /// 2. link the provider account if it isn't linked yet.
    ///
    /// A provider sign-in proves the address, so the email is marked verified.
    pub async fn sign_in(pool: &PgPool, profile: OAuthProfile) -> Result<User, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user = match User::find_by_email_on(&mut tx, &profile.email).await? {
            Some(user) => user,
            None => {
                User::insert(
                    &mut tx,
                    CreateUser {
                        username: profile.username.clone(),
                        email: profile.email.clone(),
                        password_hash: None,
                    },
                )
                .await?
            }
        };

        sqlx::query(
            r#"
            INSERT INTO accounts (user_id, type, provider, provider_account_id)
            VALUES ($1, 'oauth', $2, $3)
            ON CONFLICT (provider, provider_account_id) DO NOTHING
            "#,
        )
        .bind(user.id)
        .bind(&profile.provider)
        .bind(&profile.provider_account_id)
        .execute(&mut *tx)
        .await?;

        User::mark_email_verified(&mut tx, user.id).await?;

        tx.commit().await?;

        tracing::debug!(user_id = %user.id, provider = %profile.provider, "oauth sign-in resolved");

        Ok(user)
    }
}
