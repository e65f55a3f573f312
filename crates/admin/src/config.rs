//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ADMIN_USERNAME` - Basic-auth user name
//! - `ADMIN_PASSWORD` - Basic-auth password (min 12 chars, high entropy)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_UPLOAD_DIR` - Where uploaded artwork images are written (default: uploads)
//! - `ADMIN_PUBLIC_UPLOAD_URL` - Public URL prefix the upload directory is
//!   served under (default: /uploads)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_PASSWORD_LENGTH: usize = 12;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "admin123",
    "xxx",
    "todo",
    "fixme",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Basic-auth credentials
    pub credentials: AdminCredentials,
    /// Directory uploaded images are written to
    pub upload_dir: PathBuf,
    /// Public URL prefix for uploaded images, without trailing slash
    pub public_upload_url: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Basic-auth credentials for the single admin account.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: SecretString,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the password fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let username = get_required_env("ADMIN_USERNAME")?;
        if username.trim().is_empty() || username.contains(':') {
            return Err(ConfigError::InvalidEnvVar(
                "ADMIN_USERNAME".to_string(),
                "must be non-empty and must not contain ':'".to_string(),
            ));
        }
        let password = get_required_env("ADMIN_PASSWORD")?;
        validate_password(&password, "ADMIN_PASSWORD")?;

        Ok(Self {
            database_url: get_database_url("ADMIN_DATABASE_URL")?,
            host: parse_env("ADMIN_HOST", "127.0.0.1")?,
            port: parse_env("ADMIN_PORT", "3001")?,
            credentials: AdminCredentials {
                username,
                password: SecretString::from(password),
            },
            upload_dir: PathBuf::from(get_env_or_default("ADMIN_UPLOAD_DIR", "uploads")),
            public_upload_url: get_env_or_default("ADMIN_PUBLIC_UPLOAD_URL", "/uploads")
                .trim_end_matches('/')
                .to_string(),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl AdminCredentials {
    /// Whether `password` matches, compared in constant time.
    #[must_use]
    pub fn password_matches(&self, password: &str) -> bool {
        crate::middleware::auth::constant_time_compare(
            self.password.expose_secret().as_bytes(),
            password.as_bytes(),
        )
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that the admin password is long, not a placeholder, and not repetitive.
fn validate_password(password: &str, var_name: &str) -> Result<(), ConfigError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }

    let lower = password.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(password);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_too_short() {
        let result = validate_password("Xk9#mQ2", "ADMIN_PASSWORD");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_password_placeholder() {
        assert!(validate_password("changeme-Xk9#mQ2vL", "ADMIN_PASSWORD").is_err());
        assert!(validate_password("MyPassword2024!", "ADMIN_PASSWORD").is_err());
    }

    #[test]
    fn test_password_low_entropy() {
        assert!(validate_password("abababababababab", "ADMIN_PASSWORD").is_err());
    }

    #[test]
    fn test_password_accepted() {
        assert!(validate_password("Xk9#mQ2vLp7&Rt4z", "ADMIN_PASSWORD").is_ok());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = AdminCredentials {
            username: "galeria".to_string(),
            password: SecretString::from("Xk9#mQ2vLp7&Rt4z"),
        };
        let debug_output = format!("{credentials:?}");
        assert!(debug_output.contains("galeria"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("Xk9#mQ2vLp7&Rt4z"));
    }

    #[test]
    fn test_password_matches() {
        let credentials = AdminCredentials {
            username: "galeria".to_string(),
            password: SecretString::from("Xk9#mQ2vLp7&Rt4z"),
        };
        assert!(credentials.password_matches("Xk9#mQ2vLp7&Rt4z"));
        assert!(!credentials.password_matches("Xk9#mQ2vLp7&Rt4"));
        assert!(!credentials.password_matches(""));
    }
}
