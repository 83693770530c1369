/// Email-verification and password-reset token lifecycle
///
/// # Issuing
///
/// [`issue_token`] generates a fresh token and upserts it on
/// `(user_id, scope)`. Issuing twice for the same purpose replaces the first
/// token, which stops redeeming immediately.
///
/// # Redeeming
///
/// [`redeem_token`] takes the scope the caller expects as a required
/// argument and checks, in order:
///
/// 1. the digest exists (`NotFound`),
/// 2. the stored scope matches the expected one (`WrongScope`),
/// 3. `now <= expires_at` (`Expired`).
///
/// [`complete_password_reset`] and [`complete_email_verification`] redeem
/// and then consume the token in the same transaction as the change it
/// authorizes, so a token works once.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use nexus_shared::auth::token::TokenScope;
/// use nexus_shared::auth::tokens::{issue_token, redeem_token};
/// use nexus_shared::store::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let user = store.add_user("a@x.com", None, None);
///
/// let issued = issue_token(&store, user.id, TokenScope::ResetPassword, Utc::now()).await?;
/// let token = redeem_token(&store, &issued.raw, TokenScope::ResetPassword, Utc::now()).await?;
/// assert_eq!(token.user_id, user.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::token::{digest_token, generate_token, TokenScope};
use crate::models::token::Token;
use crate::store::AccessStore;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// No stored token matches
    #[error("token not found")]
    NotFound,

    /// The token was issued for another purpose
    #[error("token was issued for {actual}, expected {expected}")]
    WrongScope {
        expected: TokenScope,
        actual: String,
    },

    /// The token is past its expiry
    #[error("token has expired")]
    Expired,

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// A freshly issued token; `raw` goes into the email, never into storage
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub raw: String,
    pub user_id: Uuid,
    pub scope: TokenScope,
    pub expires_at: DateTime<Utc>,
}

/// Issues a token for `(user_id, scope)`, replacing any previous one
pub async fn issue_token(
    store: &dyn AccessStore,
    user_id: Uuid,
    scope: TokenScope,
    now: DateTime<Utc>,
) -> Result<IssuedToken, TokenError> {
    let (raw, digest) = generate_token();
    let expires_at = now + scope.ttl();

    store.upsert_token(user_id, scope, &digest, expires_at).await?;

    tracing::debug!(user_id = %user_id, scope = %scope, "issued one-time token");

    Ok(IssuedToken {
        raw,
        user_id,
        scope,
        expires_at,
    })
}

/// Resolves a raw token and checks scope and expiry
///
/// Does not consume the token.
pub async fn redeem_token(
    store: &dyn AccessStore,
    raw: &str,
    expected: TokenScope,
    now: DateTime<Utc>,
) -> Result<Token, TokenError> {
    let token = store
        .find_token(&digest_token(raw))
        .await?
        .ok_or(TokenError::NotFound)?;

    if token.scope() != Some(expected) {
        return Err(TokenError::WrongScope {
            expected,
            actual: token.scope.clone(),
        });
    }

    if token.is_expired_at(now) {
        return Err(TokenError::Expired);
    }

    Ok(token)
}

/// Redeems a `reset_password` token and stores the new password hash
///
/// Also clears the user's refresh token. Returns the user id.
pub async fn complete_password_reset(
    store: &dyn AccessStore,
    raw: &str,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<Uuid, TokenError> {
    let token = redeem_token(store, raw, TokenScope::ResetPassword, now).await?;

    store
        .reset_password(token.id, token.user_id, password_hash)
        .await
        .map_err(consumed_concurrently)?;

    Ok(token.user_id)
}

/// Redeems an `email_verification` token and marks the email verified
pub async fn complete_email_verification(
    store: &dyn AccessStore,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<Uuid, TokenError> {
    let token = redeem_token(store, raw, TokenScope::EmailVerification, now).await?;

    store
        .verify_email(token.id, token.user_id)
        .await
        .map_err(consumed_concurrently)?;

    Ok(token.user_id)
}

// A token deleted between lookup and consumption reads as absent
fn consumed_concurrently(err: sqlx::Error) -> TokenError {
    match err {
        sqlx::Error::RowNotFound => TokenError::NotFound,
        other => TokenError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;

    #[tokio::test]
    async fn test_issue_and_redeem() {
        let store = MemoryStore::new();
        let user = store.add_user("a@x.com", None, None);
        let now = Utc::now();

        let issued = issue_token(&store, user.id, TokenScope::EmailVerification, now)
            .await
            .unwrap();
        assert_eq!(issued.expires_at, now + Duration::hours(24));

        let token = redeem_token(&store, &issued.raw, TokenScope::EmailVerification, now)
            .await
            .unwrap();
        assert_eq!(token.user_id, user.id);
    }

    #[tokio::test]
    async fn test_second_issue_invalidates_first() {
        let store = MemoryStore::new();
        let user = store.add_user("a@x.com", None, None);
        let now = Utc::now();

        let first = issue_token(&store, user.id, TokenScope::ResetPassword, now)
            .await
            .unwrap();
        let second = issue_token(&store, user.id, TokenScope::ResetPassword, now)
            .await
            .unwrap();
        assert_ne!(first.raw, second.raw);

        let err = redeem_token(&store, &first.raw, TokenScope::ResetPassword, now)
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::NotFound));

        assert!(redeem_token(&store, &second.raw, TokenScope::ResetPassword, now)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let store = MemoryStore::new();
        let user = store.add_user("a@x.com", None, None);
        let issued_at = Utc::now();

        let issued = issue_token(&store, user.id, TokenScope::ResetPassword, issued_at)
            .await
            .unwrap();

        // Exactly at expiry is still valid
        assert!(redeem_token(&store, &issued.raw, TokenScope::ResetPassword, issued.expires_at)
            .await
            .is_ok());

        let late = issued.expires_at + Duration::seconds(1);
        let err = redeem_token(&store, &issued.raw, TokenScope::ResetPassword, late)
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::Expired));

        let err = complete_password_reset(&store, &issued.raw, "$argon2id$new", late)
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::Expired));
        assert!(store.user(user.id).unwrap().password_hash.is_none());
    }

    #[tokio::test]
    async fn test_scope_mismatch_is_rejected() {
        let store = MemoryStore::new();
        let user = store.add_user("a@x.com", None, None);
        let now = Utc::now();

        let issued = issue_token(&store, user.id, TokenScope::EmailVerification, now)
            .await
            .unwrap();

        let err = complete_password_reset(&store, &issued.raw, "$argon2id$new", now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TokenError::WrongScope {
                expected: TokenScope::ResetPassword,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let store = MemoryStore::new();

        let err = redeem_token(&store, "nope", TokenScope::ResetPassword, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::NotFound));
    }

    #[tokio::test]
    async fn test_password_reset_consumes_token() {
        let store = MemoryStore::new();
        let user = store.add_user("a@x.com", None, Some("$argon2id$old"));
        let now = Utc::now();

        let issued = issue_token(&store, user.id, TokenScope::ResetPassword, now)
            .await
            .unwrap();

        let user_id = complete_password_reset(&store, &issued.raw, "$argon2id$new", now)
            .await
            .unwrap();
        assert_eq!(user_id, user.id);
        assert_eq!(
            store.user(user.id).unwrap().password_hash.as_deref(),
            Some("$argon2id$new")
        );

        let err = complete_password_reset(&store, &issued.raw, "$argon2id$again", now)
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::NotFound));
    }

    #[tokio::test]
    async fn test_email_verification() {
        let store = MemoryStore::new();
        let user = store.add_user("a@x.com", None, None);
        let now = Utc::now();

        let issued = issue_token(&store, user.id, TokenScope::EmailVerification, now)
            .await
            .unwrap();
        complete_email_verification(&store, &issued.raw, now)
            .await
            .unwrap();

        assert!(store.user(user.id).unwrap().email_verified_at.is_some());
        assert!(store.tokens_for(user.id).is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let store = MemoryStore::new();
        let user = store.add_user("a@x.com", None, None);
        store.set_failing(true);

        let err = issue_token(&store, user.id, TokenScope::ResetPassword, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::Store(_)));
    }
}
