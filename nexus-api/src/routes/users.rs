/// User account endpoints
///
/// # Endpoints
///
/// - `POST /api/v1/users/register` - Register and send a verification email
/// - `POST /api/v1/users/login` - Exchange credentials for a token pair
/// - `POST /api/v1/users/verify-email?token=` - Confirm the email address
/// - `POST /api/v1/users/reset-password` - Email a password reset link
/// - `POST /api/v1/users/password/reset?token=` - Set a new password
/// - `POST /api/v1/users/refresh-token` - New access token from a refresh token
/// - `POST /api/v1/users/logout` - Revoke the stored refresh token
/// - `GET  /api/v1/users/:provider` - Start OAuth sign-in
/// - `GET  /api/v1/users/:provider/callback` - Finish OAuth sign-in
///
/// Only the SHA-256 digest of the current refresh token is kept on the user
/// row; logging out or resetting the password clears it.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{TokenParam, ValidJson},
    oauth::{
        clear_state_cookie, state_cookie, verify_state, GoogleOAuth, OAuthError, GOOGLE_PROVIDER,
    },
    response::ApiResponse,
    validation,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use nexus_shared::{
    auth::{
        jwt::{self, TokenPair},
        middleware::CurrentUser,
        password,
        token::{digest_token, generate_oauth_state, generate_token, verify_digest, TokenScope},
        tokens::{complete_email_verification, complete_password_reset, issue_token},
    },
    models::{
        account::{Account, OAuthProfile},
        user::{normalize_email, CreateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Same answer whether or not the email is registered
const RESET_REQUESTED_MESSAGE: &str =
    "if the email is registered, a password reset link has been sent";

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32, message = "username must be 3 to 32 characters"))]
    pub username: String,

    #[validate(email(message = "invalid email format"))]
    pub email: String,

    #[validate(custom(function = "validation::password"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewPasswordRequest {
    #[validate(custom(function = "validation::password"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[serde(alias = "refreshToken")]
    #[validate(length(min = 1, message = "refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// Issues a token pair and stores the refresh token digest
async fn start_session(state: &AppState, user: &User) -> ApiResult<TokenPairResponse> {
    let pair = jwt::issue_token_pair(
        user.id,
        &user.email,
        state.access_secret(),
        state.refresh_secret(),
    )?;

    User::set_refresh_token_hash(&state.db, user.id, Some(&digest_token(&pair.refresh_token)))
        .await?;

    Ok(pair.into())
}

/// `POST /register`
///
/// The user row and its email verification token are written in one
/// transaction. A failed verification email is logged, not returned.
pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<ApiResponse<User>> {
    let password_hash = password::hash_password(&req.password)?;

    let (raw_token, token_hash) = generate_token();
    let expires_at = Utc::now() + TokenScope::EmailVerification.ttl();

    let user = User::register(
        &state.db,
        CreateUser {
            username: Some(req.username),
            email: normalize_email(&req.email),
            password_hash: Some(password_hash),
        },
        &token_hash,
        expires_at,
    )
    .await?;

    tracing::info!(user_id = %user.id, "user registered");

    let link = state.config.frontend_link("/verify-email", &raw_token);
    if let Err(e) = state.mailer.send_email_verification(&user.email, &link).await {
        tracing::error!(user_id = %user.id, error = %e, "failed to send verification email");
    }

    Ok(ApiResponse::created("user registered successfully", user))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<ApiResponse<TokenPairResponse>> {
    let invalid = || ApiError::Unauthorized("invalid user credentials".to_string());

    let user = state
        .store
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(invalid)?;

    // OAuth-only accounts have no password to check
    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;
    if !password::verify_password(&req.password, hash)? {
        tracing::warn!(user_id = %user.id, "login with wrong password");
        return Err(invalid());
    }

    let tokens = start_session(&state, &user).await?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(ApiResponse::ok("user logged in successfully", tokens))
}

/// `POST /verify-email?token=`
pub async fn verify_email(
    State(state): State<AppState>,
    TokenParam(token): TokenParam,
) -> ApiResult<ApiResponse<()>> {
    let user_id = complete_email_verification(state.store.as_ref(), &token, Utc::now()).await?;

    tracing::info!(user_id = %user_id, "email verified");
    Ok(ApiResponse::message("email verified successfully"))
}

/// `POST /reset-password`
///
/// Issuing a new link replaces any earlier one for the same user.
pub async fn request_password_reset(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<PasswordResetRequest>,
) -> ApiResult<ApiResponse<()>> {
    let Some(user) = state.store.find_user_by_email(&req.email).await? else {
        tracing::debug!("password reset requested for unknown email");
        return Ok(ApiResponse::message(RESET_REQUESTED_MESSAGE));
    };

    if !user.has_password() {
        return Err(ApiError::BadRequest(
            "this account signs in with a social provider".to_string(),
        ));
    }

    let issued = issue_token(
        state.store.as_ref(),
        user.id,
        TokenScope::ResetPassword,
        Utc::now(),
    )
    .await?;

    let link = state.config.frontend_link("/reset-password", &issued.raw);
    state.mailer.send_password_reset(&user.email, &link).await?;

    tracing::info!(user_id = %user.id, "password reset link sent");
    Ok(ApiResponse::message(RESET_REQUESTED_MESSAGE))
}

/// `POST /password/reset?token=`
pub async fn reset_password(
    State(state): State<AppState>,
    TokenParam(token): TokenParam,
    ValidJson(req): ValidJson<NewPasswordRequest>,
) -> ApiResult<ApiResponse<()>> {
    let password_hash = password::hash_password(&req.password)?;

    let user_id =
        complete_password_reset(state.store.as_ref(), &token, &password_hash, Utc::now()).await?;

    tracing::info!(user_id = %user_id, "password reset");
    Ok(ApiResponse::message("password reset successfully"))
}

/// `POST /refresh-token`
///
/// The refresh token must be the one most recently issued to the user.
pub async fn refresh_token(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> ApiResult<ApiResponse<AccessTokenResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.refresh_secret())?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid refresh token".to_string()))?;

    let current = user
        .refresh_token_hash
        .as_deref()
        .is_some_and(|stored| verify_digest(&req.refresh_token, stored));
    if !current {
        tracing::warn!(user_id = %user.id, "revoked refresh token presented");
        return Err(ApiError::Unauthorized("invalid refresh token".to_string()));
    }

    let claims = jwt::Claims::new(user.id, user.email.clone(), jwt::TokenType::Access);
    let access_token = jwt::create_token(&claims, state.access_secret())?;

    Ok(ApiResponse::ok(
        "access token refreshed successfully",
        AccessTokenResponse { access_token },
    ))
}

/// `POST /logout`
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<ApiResponse<()>> {
    User::set_refresh_token_hash(&state.db, user.id, None).await?;

    tracing::info!(user_id = %user.id, "user logged out");
    Ok(ApiResponse::message("user logged out successfully"))
}

fn google(state: &AppState, provider: &str) -> Result<Arc<GoogleOAuth>, OAuthError> {
    if provider != GOOGLE_PROVIDER {
        return Err(OAuthError::UnsupportedProvider(provider.to_string()));
    }
    state.oauth.clone().ok_or(OAuthError::NotConfigured)
}

/// `GET /:provider`
///
/// Redirects to the provider with a fresh `state`, also stored in an
/// HttpOnly cookie for ten minutes.
pub async fn oauth_start(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> ApiResult<Response> {
    let client = google(&state, &provider)?;

    let oauth_state = generate_oauth_state();
    let url = client.authorization_url(&oauth_state)?;
    let cookie = state_cookie(&oauth_state, state.config.api.production)?;

    let mut response = Redirect::temporary(&url).into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);

    Ok(response)
}

/// `GET /:provider/callback?state=&code=`
///
/// Creates the user on first sign-in and links the provider account.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthCallbackQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let client = google(&state, &provider)?;

    verify_state(&headers, query.state.as_deref())?;
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or(OAuthError::MissingCode)?;

    let access_token = client.exchange_code(&code).await?;
    let info = client.fetch_user(&access_token).await?;

    if info.email_verified == Some(false) {
        return Err(ApiError::Forbidden("provider email is not verified".to_string()));
    }

    let user = Account::sign_in(
        &state.db,
        OAuthProfile {
            provider: provider.clone(),
            provider_account_id: info.sub,
            email: info.email,
            username: info.name,
        },
    )
    .await?;

    let tokens = start_session(&state, &user).await?;

    tracing::info!(user_id = %user.id, provider = %provider, "oauth sign-in");

    let mut response = ApiResponse::ok("user signed in successfully", tokens).into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, clear_state_cookie());

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validation() {
        let ok = RegisterRequest {
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "correct horse".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            username: "ad".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_refresh_request_accepts_camel_case() {
        let req: RefreshRequest = serde_json::from_str(r#"{"refreshToken":"abc"}"#).unwrap();
        assert_eq!(req.refresh_token, "abc");
    }

    #[test]
    fn test_token_pair_serializes_camel_case() {
        let value = serde_json::to_value(TokenPairResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
        })
        .unwrap();

        assert_eq!(value["accessToken"], "a");
        assert_eq!(value["refreshToken"], "r");
    }
}
