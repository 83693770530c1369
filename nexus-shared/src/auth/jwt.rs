/// Session tokens for signed-in users
///
/// Two HS256 tokens are issued at sign-in. The access token (24h) rides on
/// every request as `Authorization: Bearer <token>`. The refresh token (7d)
/// is only exchanged for a new access token, and its digest is kept on the
/// user row so logout and password reset can revoke it.
///
/// Each kind is signed with its own secret and carries a `token_type`
/// claim; validating one kind with the other's secret or type fails.
///
/// # Example
///
/// ```
/// use nexus_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
///
/// let claims = Claims::new(user_id, "a@x.com".to_string(), TokenType::Access);
/// let token = create_token(&claims, "access-secret")?;
///
/// let validated = validate_access_token(&token, "access-secret")?;
/// assert_eq!(validated.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim stamped into every token
pub const ISSUER: &str = "nexus";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token is of the wrong type (access vs refresh)
    #[error("Expected {expected} token, got {actual} token")]
    WrongType {
        expected: &'static str,
        actual: &'static str,
    },

    /// Invalid issuer
    #[error("Invalid token issuer")]
    InvalidIssuer,
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (short-lived, 24 hours)
    Access,

    /// Refresh token (long-lived, 7 days)
    Refresh,
}

impl TokenType {
    /// Gets default expiration duration for token type
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(24),
            TokenType::Refresh => Duration::days(7),
        }
    }

    /// Gets token type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "nexus")
/// - `iat`: Issued at timestamp
/// - `exp`: Expiration timestamp
/// - `nbf`: Not before timestamp
///
/// # Custom Claims
///
/// - `email`: Email address at issue time. Informational only; the
///   authentication middleware re-reads the user from storage.
/// - `token_type`: Access or refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Issuer - Always "nexus"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Email snapshot (custom claim)
    pub email: String,

    /// Token type (custom claim)
    pub token_type: TokenType,
}

impl Claims {
    /// Creates new claims with the default expiration of the token type
    pub fn new(user_id: Uuid, email: String, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, email, token_type, token_type.default_expiration())
    }

    /// Claims that expire `expires_in` from now
    pub fn with_expiration(
        user_id: Uuid,
        email: String,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            email,
            token_type,
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Access and refresh tokens issued together on login
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Creates a JWT token from claims
///
/// Signs the token using HS256 with the provided secret.
///
/// # Errors
///
/// Returns `JwtError::CreateError` if token creation fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues an access token and a refresh token for a user
///
/// The access token is signed with `access_secret`, the refresh token with
/// `refresh_secret`.
pub fn issue_token_pair(
    user_id: Uuid,
    email: &str,
    access_secret: &str,
    refresh_secret: &str,
) -> Result<TokenPair, JwtError> {
    let access = Claims::new(user_id, email.to_string(), TokenType::Access);
    let refresh = Claims::new(user_id, email.to_string(), TokenType::Refresh);

    Ok(TokenPair {
        access_token: create_token(&access, access_secret)?,
        refresh_token: create_token(&refresh, refresh_secret)?,
    })
}

/// Checks signature, issuer, `exp` and `nbf` with no leeway and returns the
/// claims. Does not look at `token_type`.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

fn expect_type(claims: Claims, expected: TokenType) -> Result<Claims, JwtError> {
    if claims.token_type != expected {
        return Err(JwtError::WrongType {
            expected: expected.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

/// Validates token and checks it's an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    expect_type(validate_token(token, secret)?, TokenType::Access)
}

/// Validates token and checks it's a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    expect_type(validate_token(token, secret)?, TokenType::Refresh)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS: &str = "test-access-secret-at-least-32-bytes-long";
    const REFRESH: &str = "test-refresh-secret-at-least-32-bytes-long";

    #[test]
    fn test_token_type_expiration() {
        assert_eq!(TokenType::Access.default_expiration(), Duration::hours(24));
        assert_eq!(TokenType::Refresh.default_expiration(), Duration::days(7));
    }

    #[test]
    fn test_create_and_validate_token() {
        let user_id = Uuid::new_v4();

        let claims = Claims::new(user_id, "a@x.com".to_string(), TokenType::Access);
        let token = create_token(&claims, ACCESS).expect("Should create token");

        let validated = validate_token(&token, ACCESS).expect("Should validate token");
        assert_eq!(validated.sub, user_id);
        assert_eq!(validated.email, "a@x.com");
        assert_eq!(validated.token_type, TokenType::Access);
        assert_eq!(validated.iss, ISSUER);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let claims = Claims::new(Uuid::new_v4(), "a@x.com".to_string(), TokenType::Access);
        let token = create_token(&claims, ACCESS).unwrap();

        assert!(validate_token(&token, "wrong-secret").is_err());
    }

    #[test]
    fn test_validate_expired_token() {
        let claims = Claims::with_expiration(
            Uuid::new_v4(),
            "a@x.com".to_string(),
            TokenType::Access,
            Duration::seconds(-3600),
        );
        assert!(claims.is_expired());

        let token = create_token(&claims, ACCESS).unwrap();
        let result = validate_token(&token, ACCESS);

        assert!(matches!(result.unwrap_err(), JwtError::Expired));
    }

    #[test]
    fn test_access_and_refresh_types_are_not_interchangeable() {
        let pair = issue_token_pair(Uuid::new_v4(), "a@x.com", ACCESS, REFRESH).unwrap();

        assert!(validate_access_token(&pair.access_token, ACCESS).is_ok());
        assert!(validate_refresh_token(&pair.refresh_token, REFRESH).is_ok());

        // Each token is signed with its own secret
        assert!(validate_access_token(&pair.refresh_token, ACCESS).is_err());
        assert!(validate_refresh_token(&pair.access_token, REFRESH).is_err());
    }

    #[test]
    fn test_refresh_token_signed_with_access_secret_is_wrong_type() {
        let claims = Claims::new(Uuid::new_v4(), "a@x.com".to_string(), TokenType::Refresh);
        let token = create_token(&claims, ACCESS).unwrap();

        let err = validate_access_token(&token, ACCESS).unwrap_err();
        assert!(matches!(err, JwtError::WrongType { expected: "access", .. }));
    }
}
