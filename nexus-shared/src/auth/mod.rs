/// Authentication and authorization utilities
///
/// This module provides the security primitives for Nexus:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: Access/refresh JWT generation and validation
/// - [`token`]: High-entropy one-time token generation and digests
/// - [`tokens`]: Email-verification and password-reset token lifecycle
/// - [`invitation`]: Board invitation state machine
/// - [`roles`]: Board and workspace role hierarchies
/// - [`middleware`]: Bearer-token resolution into a [`middleware::CurrentUser`]
/// - [`authorization`]: Board, workspace and project role checks
///
/// # Example
///
/// ```no_run
/// use nexus_shared::auth::password::{hash_password, verify_password};
/// use nexus_shared::auth::jwt::{create_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), "a@x.com".to_string(), TokenType::Access);
/// let token = create_token(&claims, "access-secret")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod invitation;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod roles;
pub mod token;
pub mod tokens;
