/// Bearer-token authentication
///
/// [`resolve_bearer`] turns the raw `Authorization` header into a
/// [`CurrentUser`]:
///
/// 1. header present and of the form `Bearer <token>`,
/// 2. token is a valid, unexpired access JWT,
/// 3. the user named by `sub` still exists in the store.
///
/// The token's embedded email is never trusted; the user is re-read on every
/// request so a deleted account stops working immediately.
///
/// The API's authentication layer stores the result in the request
/// extensions. Handlers take it as an extractor:
///
/// ```no_run
/// use nexus_shared::auth::middleware::CurrentUser;
///
/// async fn handler(user: CurrentUser) -> String {
///     format!("Hello, {}!", user.email)
/// }
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::models::user::User;
use crate::store::AccessStore;

/// The authenticated caller, attached to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingCredentials,

    #[error("authorization header must be a bearer token")]
    InvalidFormat,

    #[error("invalid access token: {0}")]
    InvalidToken(#[from] JwtError),

    /// The token is valid but its user no longer exists
    #[error("user no longer exists")]
    UnknownUser,

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "authentication failed");
            "something went wrong with our servers"
        } else {
            "unauthorized"
        };

        let body = Json(serde_json::json!({
            "status": status.as_u16(),
            "message": message,
            "data": null,
        }));

        (status, body).into_response()
    }
}

/// Extracts the bearer token from an `Authorization` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidFormat);
    }

    Ok(token)
}

/// Verifies an `Authorization` header and resolves the caller
///
/// # Errors
///
/// - `MissingCredentials` / `InvalidFormat`: no usable bearer header
/// - `InvalidToken`: bad signature, expired, or not an access token
/// - `UnknownUser`: the user was deleted
/// - `Store`: the lookup itself failed
pub async fn resolve_bearer(
    store: &dyn AccessStore,
    header: Option<&str>,
    access_secret: &str,
) -> Result<CurrentUser, AuthError> {
    let token = bearer_token(header)?;
    let claims = validate_access_token(token, access_secret)?;

    let user = store
        .find_user_by_id(claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    Ok(user.into())
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}
