/// Error handling for the API server
///
/// Every handler returns `Result<T, ApiError>`. Errors render as the same
/// envelope successful responses use:
///
/// ```json
/// { "status": 403, "message": "insufficient permissions", "data": null }
/// ```
///
/// Domain errors from `nexus-shared` convert with `?`. Server-side failures
/// are logged with their cause and always answer with
/// [`INTERNAL_ERROR_MESSAGE`].
///
/// # Example
///
/// ```
/// use nexus_api::error::{ApiError, ApiResult};
///
/// fn find(found: bool) -> ApiResult<&'static str> {
///     if !found {
///         return Err(ApiError::NotFound("board not found".to_string()));
///     }
///     Ok("board")
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nexus_shared::auth::{
    authorization::AuthzError, invitation::InvitationError, jwt::JwtError,
    middleware::AuthError, password::PasswordError, tokens::TokenError,
};
use nexus_shared::mailer::MailerError;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::oauth::OAuthError;
use crate::response::Envelope;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// The only message a 5xx response ever carries
pub const INTERNAL_ERROR_MESSAGE: &str = "something went wrong with our servers";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Field validation failed (400), details go into `data`
    ValidationError(Vec<ValidationErrorDetail>),

    /// Unauthenticated (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409)
    Conflict(String),

    /// Body could not be read as JSON (422)
    UnprocessableEntity(String),

    /// Internal server error (500); the string is logged, never sent
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::UnprocessableEntity(msg) => write!(f, "Unprocessable entity: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, data) = match self {
            ApiError::InternalError(cause) => {
                tracing::error!(cause = %cause, "request failed");
                (INTERNAL_ERROR_MESSAGE.to_string(), serde_json::Value::Null)
            }
            ApiError::ValidationError(details) => {
                tracing::warn!(errors = details.len(), "request validation failed");
                (
                    "failed to validate request body".to_string(),
                    serde_json::to_value(details).unwrap_or_default(),
                )
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::UnprocessableEntity(msg) => {
                tracing::warn!(status = status.as_u16(), message = %msg, "request rejected");
                (msg, serde_json::Value::Null)
            }
        };

        (status, Json(Envelope::new(status, message, data))).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "invalid value".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(details)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("resource not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                match db_err.constraint() {
                    Some(constraint) if constraint.contains("email") => {
                        ApiError::Conflict("email already registered".to_string())
                    }
                    Some(constraint) if constraint.contains("username") => {
                        ApiError::Conflict("username already taken".to_string())
                    }
                    _ => ApiError::Conflict("resource already exists".to_string()),
                }
            }
            other => ApiError::InternalError(format!("database error: {}", other)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(e) => ApiError::InternalError(format!("user lookup failed: {}", e)),
            AuthError::InvalidToken(JwtError::Expired) => {
                ApiError::Unauthorized("access token expired".to_string())
            }
            _ => ApiError::Unauthorized("unauthorized".to_string()),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotMember(scope) => {
                ApiError::Forbidden(format!("you are not a member of this {}", scope))
            }
            AuthzError::InsufficientRole { .. } => {
                ApiError::Forbidden("insufficient permissions".to_string())
            }
            AuthzError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            AuthzError::Store(e) => ApiError::InternalError(format!("role lookup failed: {}", e)),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::NotFound => ApiError::NotFound("token not found".to_string()),
            TokenError::WrongScope { .. } => ApiError::BadRequest("invalid token".to_string()),
            TokenError::Expired => ApiError::BadRequest("token has expired".to_string()),
            TokenError::Store(e) => ApiError::InternalError(format!("token store: {}", e)),
        }
    }
}

impl From<InvitationError> for ApiError {
    fn from(err: InvitationError) -> Self {
        match err {
            InvitationError::NotFound => ApiError::NotFound("invitation not found".to_string()),
            InvitationError::AlreadyAccepted => {
                ApiError::Conflict("invitation has already been accepted".to_string())
            }
            InvitationError::Expired => {
                ApiError::BadRequest("invitation has expired".to_string())
            }
            InvitationError::Forbidden => {
                ApiError::Forbidden("this invitation was sent to another email".to_string())
            }
            InvitationError::Conflict => {
                ApiError::Conflict("user is already a member of this board".to_string())
            }
            InvitationError::RoleNotInvitable(role) => {
                ApiError::BadRequest(format!("role {} cannot be granted by invitation", role))
            }
            e @ (InvitationError::UnknownRole(_) | InvitationError::Store(_)) => {
                ApiError::InternalError(e.to_string())
            }
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("token expired".to_string()),
            _ => ApiError::Unauthorized("invalid token".to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("password operation failed: {}", err))
    }
}

impl From<MailerError> for ApiError {
    fn from(err: MailerError) -> Self {
        ApiError::InternalError(format!("mailer: {}", err))
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::UnsupportedProvider(_) | OAuthError::NotConfigured => {
                ApiError::BadRequest("provider not supported".to_string())
            }
            OAuthError::MissingState => ApiError::BadRequest("state cookie not found".to_string()),
            OAuthError::InvalidState => {
                ApiError::BadRequest("invalid state parameter".to_string())
            }
            OAuthError::MissingCode => ApiError::BadRequest("code is required".to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[tokio::test]
    async fn test_internal_error_is_not_leaked() {
        let response = ApiError::InternalError("connection refused at 10.0.0.3".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["status"], 500);
        assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_validation_details_in_data() {
        let response = ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "email".to_string(),
            message: "invalid email".to_string(),
        }])
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["data"][0]["field"], "email");
    }

    #[test]
    fn test_domain_error_statuses() {
        assert_eq!(
            ApiError::from(InvitationError::AlreadyAccepted).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(InvitationError::Expired).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(InvitationError::Forbidden).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(TokenError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TokenError::Expired).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AuthzError::NotMember("board")).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(AuthzError::Store(sqlx::Error::PoolTimedOut)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(AuthError::UnknownUser).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(sqlx::Error::RowNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
