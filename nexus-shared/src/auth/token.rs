/// One-time token generation and digests
///
/// Tokens authorize a single action sent by email: verifying an address,
/// resetting a password, or joining a board. They are opaque, URL-safe and
/// high-entropy.
///
/// # Format
///
/// 48 characters drawn from `[A-Za-z0-9]` with the thread-local CSPRNG,
/// about 285 bits of entropy. Only the SHA-256 hex digest is stored; the
/// raw value exists in the email link and nowhere else.
///
/// # Example
///
/// ```
/// use nexus_shared::auth::token::{digest_token, generate_token, TOKEN_LENGTH};
///
/// let (raw, digest) = generate_token();
/// assert_eq!(raw.len(), TOKEN_LENGTH);
/// assert_eq!(digest_token(&raw), digest);
/// ```

use chrono::Duration;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a raw one-time token (characters)
pub const TOKEN_LENGTH: usize = 48;

/// Lifetime of a board invitation
pub const INVITATION_TTL_HOURS: i64 = 48;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Purpose a stored token was issued for
///
/// A user holds at most one live token per scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    /// Confirms ownership of the registered email address (24h)
    EmailVerification,

    /// Authorizes setting a new password (1h)
    ResetPassword,
}

impl TokenScope {
    /// Time a freshly issued token stays redeemable
    pub fn ttl(&self) -> Duration {
        match self {
            TokenScope::EmailVerification => Duration::hours(24),
            TokenScope::ResetPassword => Duration::hours(1),
        }
    }

    /// Scope name as stored in the `tokens.scope` column
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::EmailVerification => "email_verification",
            TokenScope::ResetPassword => "reset_password",
        }
    }

    /// Parses a stored scope name
    pub fn parse(scope: &str) -> Option<Self> {
        match scope {
            "email_verification" => Some(TokenScope::EmailVerification),
            "reset_password" => Some(TokenScope::ResetPassword),
            _ => None,
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Board invitation lifetime as a duration
pub fn invitation_ttl() -> Duration {
    Duration::hours(INVITATION_TTL_HOURS)
}

/// Generates a new one-time token
///
/// Returns `(raw_token, sha256_hex_digest)`. Send the raw token, store the
/// digest.
pub fn generate_token() -> (String, String) {
    let mut rng = rand::thread_rng();

    let raw: String = (0..TOKEN_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    let digest = digest_token(&raw);

    (raw, digest)
}

/// SHA-256 hex digest of a raw token (64 characters)
pub fn digest_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks a raw token against a stored digest in constant time
pub fn verify_digest(raw: &str, stored_digest: &str) -> bool {
    constant_time_compare(&digest_token(raw), stored_digest)
}

/// Generates a random OAuth `state` value (32 bytes, hex-encoded)
pub fn generate_oauth_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Constant-time string comparison
///
/// Compares every byte of equal-length inputs without short-circuiting.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_token_format() {
        let (raw, digest) = generate_token();

        assert_eq!(raw.len(), TOKEN_LENGTH);
        assert!(raw.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_token_uniqueness() {
        let tokens: HashSet<String> = (0..200).map(|_| generate_token().0).collect();
        assert_eq!(tokens.len(), 200);
    }

    #[test]
    fn test_digest_is_deterministic_and_not_the_token() {
        let (raw, digest) = generate_token();

        assert_eq!(digest_token(&raw), digest);
        assert_ne!(raw, digest);
        assert!(verify_digest(&raw, &digest));
        assert!(!verify_digest("something-else", &digest));
    }

    #[test]
    fn test_known_digest() {
        // sha256("abc")
        assert_eq!(
            digest_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_scope_ttls() {
        assert_eq!(TokenScope::EmailVerification.ttl(), Duration::hours(24));
        assert_eq!(TokenScope::ResetPassword.ttl(), Duration::hours(1));
        assert_eq!(invitation_ttl(), Duration::hours(48));
    }

    #[test]
    fn test_scope_names() {
        for scope in [TokenScope::EmailVerification, TokenScope::ResetPassword] {
            assert_eq!(TokenScope::parse(scope.as_str()), Some(scope));
        }
        assert_eq!(TokenScope::parse("invitation"), None);
    }

    #[test]
    fn test_oauth_state() {
        let a = generate_oauth_state();
        let b = generate_oauth_state();

        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hello!"));
        assert!(constant_time_compare("", ""));
    }
}
