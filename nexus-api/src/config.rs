/// Configuration management for the API server
///
/// Loaded once at startup from environment variables (a `.env` file is read
/// first when present). Missing or malformed values fail startup.
///
/// # Environment Variables
///
/// | Variable | Required | Default |
/// |----------|----------|---------|
/// | `API_HOST` | no | `0.0.0.0` |
/// | `API_PORT` | no | `8080` |
/// | `PRODUCTION` | no | `false` |
/// | `CORS_ORIGINS` | no | `*` (comma-separated) |
/// | `FRONTEND_URL` | no | `http://localhost:3000` |
/// | `DATABASE_URL` | yes | |
/// | `DATABASE_MAX_CONNECTIONS` | no | `10` |
/// | `ACCESS_TOKEN_SECRET` | yes, 32+ chars | |
/// | `REFRESH_TOKEN_SECRET` | yes, 32+ chars | |
/// | `SMTP_HOST` | no, mail is logged when unset | |
/// | `SMTP_PORT` | no | `587` |
/// | `SMTP_USERNAME` / `SMTP_PASSWORD` | no | |
/// | `FROM_EMAIL` | with `SMTP_HOST` | |
/// | `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` / `GOOGLE_REDIRECT_URL` | no, OAuth is disabled when unset | |
///
/// # Example
///
/// ```no_run
/// use nexus_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use nexus_shared::mailer::SmtpConfig;
use std::env;

/// Shortest accepted JWT signing secret
pub const MIN_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,

    /// `None` when `SMTP_HOST` is unset
    pub smtp: Option<SmtpConfig>,

    /// `None` when the Google credentials are unset
    pub google: Option<GoogleConfig>,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Enables HSTS and strict CORS
    pub production: bool,

    /// Allowed CORS origins, `*` for any
    pub cors_origins: Vec<String>,

    /// Base URL used in email links
    pub frontend_url: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT signing secrets
///
/// Access and refresh tokens are signed with different keys so a leaked
/// refresh secret can't mint access tokens.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
}

/// Google OAuth client registration
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable if a required one is missing, a
    /// secret is shorter than [`MIN_SECRET_LEN`], or a number doesn't parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        let port = var("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .context("API_PORT must be a port number")?;

        let production = var("PRODUCTION")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let access_secret = secret(required("ACCESS_TOKEN_SECRET")?, "ACCESS_TOKEN_SECRET")?;
        let refresh_secret = secret(required("REFRESH_TOKEN_SECRET")?, "REFRESH_TOKEN_SECRET")?;

        let smtp = match var("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: var("SMTP_PORT")
                    .unwrap_or_else(|| "587".to_string())
                    .parse::<u16>()
                    .context("SMTP_PORT must be a port number")?,
                username: var("SMTP_USERNAME"),
                password: var("SMTP_PASSWORD"),
                from: required("FROM_EMAIL")?,
            }),
            None => None,
        };

        let google = match (
            var("GOOGLE_CLIENT_ID"),
            var("GOOGLE_CLIENT_SECRET"),
            var("GOOGLE_REDIRECT_URL"),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_url)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_url,
            }),
            _ => None,
        };

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
                production,
                cors_origins,
                frontend_url: var("FRONTEND_URL")
                    .unwrap_or_else(|| "http://localhost:3000".to_string())
                    .trim_end_matches('/')
                    .to_string(),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections,
            },
            jwt: JwtConfig {
                access_secret,
                refresh_secret,
            },
            smtp,
            google,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Absolute frontend link, e.g. `frontend_link("/join", token)`
    pub fn frontend_link(&self, path: &str, token: &str) -> String {
        format!("{}{}?token={}", self.api.frontend_url, path, token)
    }
}

fn secret(value: String, name: &str) -> anyhow::Result<String> {
    if value.len() < MIN_SECRET_LEN {
        anyhow::bail!("{} must be at least {} characters long", name, MIN_SECRET_LEN);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgresql://localhost/nexus"),
        ("ACCESS_TOKEN_SECRET", "access-secret-at-least-32-bytes-long!!"),
        ("REFRESH_TOKEN_SECRET", "refresh-secret-at-least-32-bytes-long!"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(BASE)).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.api.production);
        assert!(config.smtp.is_none());
        assert!(config.google.is_none());
    }

    #[test]
    fn test_missing_database_url() {
        let err = Config::from_lookup(lookup(&BASE[1..])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut vars = BASE.to_vec();
        vars[1] = ("ACCESS_TOKEN_SECRET", "too-short");

        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("ACCESS_TOKEN_SECRET"));
    }

    #[test]
    fn test_smtp_requires_sender() {
        let mut vars = BASE.to_vec();
        vars.push(("SMTP_HOST", "smtp.example.com"));
        assert!(Config::from_lookup(lookup(&vars)).is_err());

        vars.push(("FROM_EMAIL", "Nexus <no-reply@example.com>"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.host, "smtp.example.com");
    }

    #[test]
    fn test_frontend_link() {
        let mut vars = BASE.to_vec();
        vars.push(("FRONTEND_URL", "https://app.example.com/"));
        vars.push(("CORS_ORIGINS", "https://app.example.com, https://admin.example.com"));

        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(
            config.frontend_link("/join", "abc"),
            "https://app.example.com/join?token=abc"
        );
        assert_eq!(config.api.cors_origins.len(), 2);
    }
}
