/// Google sign-in (OAuth 2.0 authorization-code flow)
///
/// 1. `GET /api/v1/users/google` sets an HttpOnly `oauth_state` cookie and
///    redirects to Google's consent page with the same `state`.
/// 2. Google redirects back to `/api/v1/users/google/callback?state=..&code=..`.
///    The state must match the cookie; the cookie is then cleared.
/// 3. The code is exchanged for an access token, and the profile is read
///    from the v3 userinfo endpoint.

use axum::http::{header, HeaderMap, HeaderValue};
use nexus_shared::auth::token::constant_time_compare;
use reqwest::Url;
use serde::Deserialize;

use crate::config::GoogleConfig;

pub const GOOGLE_PROVIDER: &str = "google";
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

pub const STATE_COOKIE: &str = "oauth_state";

/// Seconds the state cookie lives
pub const STATE_COOKIE_MAX_AGE: u32 = 600;

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("provider {0:?} is not supported")]
    UnsupportedProvider(String),

    #[error("oauth is not configured")]
    NotConfigured,

    #[error("state cookie not found")]
    MissingState,

    #[error("state parameter does not match")]
    InvalidState,

    #[error("authorization code is missing")]
    MissingCode,

    #[error("code exchange failed: {0}")]
    Exchange(String),

    #[error("userinfo request failed: {0}")]
    UserInfo(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Profile returned by the v3 userinfo endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GoogleUserInfo {
    /// Stable Google account id
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Google OAuth client
#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleOAuth {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Consent page URL carrying `state`
    pub fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        let url = Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", "email profile"),
                ("state", state),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| OAuthError::Url(e.to_string()))?;

        Ok(url.into())
    }

    /// Exchanges an authorization code for a Google access token
    pub async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Exchange(format!("HTTP {}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    pub async fn fetch_user(&self, access_token: &str) -> Result<GoogleUserInfo, OAuthError> {
        let response = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OAuthError::UserInfo(format!("HTTP {}", response.status())));
        }

        Ok(response.json().await?)
    }
}

/// `Set-Cookie` value storing the state
pub fn state_cookie(state: &str, secure: bool) -> Result<HeaderValue, OAuthError> {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        STATE_COOKIE, state, STATE_COOKIE_MAX_AGE
    );
    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie).map_err(|_| OAuthError::InvalidState)
}

/// `Set-Cookie` value expiring the state cookie
pub fn clear_state_cookie() -> HeaderValue {
    HeaderValue::from_static("oauth_state=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

/// Checks the callback's `state` against the cookie
pub fn verify_state(headers: &HeaderMap, returned: Option<&str>) -> Result<(), OAuthError> {
    let expected = read_cookie(headers, STATE_COOKIE).ok_or(OAuthError::MissingState)?;

    match returned {
        Some(state) if !state.is_empty() && constant_time_compare(state, &expected) => Ok(()),
        _ => Err(OAuthError::InvalidState),
    }
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoogleOAuth {
        GoogleOAuth::new(GoogleConfig {
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
            redirect_url: "http://localhost:8080/api/v1/users/google/callback".to_string(),
        })
    }

    #[test]
    fn test_authorization_url() {
        let url = Url::parse(&client().authorization_url("abc123").unwrap()).unwrap();
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert!(params.contains(&("state".to_string(), "abc123".to_string())));
        assert!(params.contains(&("client_id".to_string(), "client-123".to_string())));
        assert!(params.contains(&("scope".to_string(), "email profile".to_string())));
    }

    #[test]
    fn test_state_cookie_round_trip() {
        let cookie = state_cookie("abc123", false).unwrap();
        assert!(cookie.to_str().unwrap().contains("HttpOnly"));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; oauth_state=abc123"),
        );

        assert!(verify_state(&headers, Some("abc123")).is_ok());
        assert!(matches!(
            verify_state(&headers, Some("other")),
            Err(OAuthError::InvalidState)
        ));
        assert!(matches!(
            verify_state(&headers, None),
            Err(OAuthError::InvalidState)
        ));
        assert!(matches!(
            verify_state(&HeaderMap::new(), Some("abc123")),
            Err(OAuthError::MissingState)
        ));
    }

    #[test]
    fn test_userinfo_deserializes() {
        let info: GoogleUserInfo = serde_json::from_str(
            r#"{"sub":"1098","email":"a@x.com","email_verified":true,"picture":"p"}"#,
        )
        .unwrap();

        assert_eq!(info.sub, "1098");
        assert_eq!(info.name, None);
    }
}
