//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (postgres backend)
//! - `MAPLEMART_DATABASE_URL` - `PostgreSQL` connection string (falls back
//!   to the generic `DATABASE_URL`)
//!
//! ## Optional
//! - `MAPLEMART_BACKEND` - `postgres` (default) or `memory`
//! - `MAPLEMART_HOST` - Bind address (default: 127.0.0.1)
//! - `MAPLEMART_PORT` - Listen port (default: 5000)
//! - `MAPLEMART_UPLOAD_DIR` - Directory for uploaded assets (default: uploads)
//! - `MAPLEMART_ALLOWED_ORIGINS` - Comma-separated CORS allow-list
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! ## Optional email block (all required once `SMTP_HOST` is set)
//! - `SMTP_HOST`, `SMTP_PORT` (default 587), `SMTP_USERNAME`, `SMTP_PASSWORD`
//! - `EMAIL_FROM_ADDRESS` - Sender for transactional mail
//! - `EMAIL_STAFF_ADDRESS` - Recipient for new-order alerts

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which storage backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Durable `PostgreSQL` storage (production).
    #[default]
    Postgres,
    /// Process-memory storage (development, demos).
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(format!("invalid store backend: {s}")),
        }
    }
}

/// SMTP configuration for outbound notifications.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    /// Sender for transactional mail.
    pub from_address: String,
    /// Recipient for new-order alerts to store staff.
    pub staff_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("staff_address", &self.staff_address)
            .finish()
    }
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Storage backend selection.
    pub backend: StoreBackend,
    /// `PostgreSQL` connection URL (contains password); required for the
    /// postgres backend.
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Directory holding uploaded catalog assets, served under `/uploads`.
    pub upload_dir: PathBuf,
    /// Origins allowed by CORS; empty means a permissive policy.
    pub allowed_origins: Vec<String>,
    /// Outbound email, when configured.
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from a `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let backend = get_env_or_default("MAPLEMART_BACKEND", "postgres")
            .parse::<StoreBackend>()
            .map_err(|e| ConfigError::InvalidEnvVar("MAPLEMART_BACKEND".to_owned(), e))?;

        let database_url = get_database_url();
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "MAPLEMART_DATABASE_URL".to_owned(),
            ));
        }

        let host = get_env_or_default("MAPLEMART_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("MAPLEMART_HOST".to_owned(), e.to_string()))?;
        let port = get_env_or_default("MAPLEMART_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("MAPLEMART_PORT".to_owned(), e.to_string()))?;

        let upload_dir = PathBuf::from(get_env_or_default("MAPLEMART_UPLOAD_DIR", "uploads"));
        let allowed_origins =
            parse_origins(&get_optional_env("MAPLEMART_ALLOWED_ORIGINS").unwrap_or_default());

        Ok(Self {
            backend,
            database_url,
            host,
            port,
            upload_dir,
            allowed_origins,
            email: email_from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Load the email block; present only when `SMTP_HOST` is set, in which case
/// the remaining fields are required.
fn email_from_env() -> Result<Option<EmailConfig>, ConfigError> {
    let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
        return Ok(None);
    };
    let smtp_port = get_env_or_default("SMTP_PORT", "587")
        .parse::<u16>()
        .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_owned(), e.to_string()))?;
    Ok(Some(EmailConfig {
        smtp_host,
        smtp_port,
        smtp_username: get_required_env("SMTP_USERNAME")?,
        smtp_password: SecretString::from(get_required_env("SMTP_PASSWORD")?),
        from_address: get_required_env("EMAIL_FROM_ADDRESS")?,
        staff_address: get_required_env("EMAIL_STAFF_ADDRESS")?,
    }))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url() -> Option<SecretString> {
    get_optional_env("MAPLEMART_DATABASE_URL")
        .or_else(|| get_optional_env("DATABASE_URL"))
        .map(SecretString::from)
}

/// Split a comma-separated origin list, dropping empty entries.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn backend_parses_known_names() {
        assert_eq!(
            "postgres".parse::<StoreBackend>().unwrap(),
            StoreBackend::Postgres
        );
        assert_eq!(
            "memory".parse::<StoreBackend>().unwrap(),
            StoreBackend::Memory
        );
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn origins_split_and_trim() {
        let origins = parse_origins("https://shop.example.com, http://localhost:5173 ,,");
        assert_eq!(
            origins,
            vec!["https://shop.example.com", "http://localhost:5173"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn socket_addr_combines_host_and_port() {
        let config = ApiConfig {
            backend: StoreBackend::Memory,
            database_url: None,
            host: "0.0.0.0".parse().unwrap(),
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
            allowed_origins: vec![],
            email: None,
            sentry_dsn: None,
        };
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "0.0.0.0");
        assert_eq!(addr.port(), 5000);
    }

    #[test]
    fn email_config_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.example.com".to_owned(),
            smtp_port: 587,
            smtp_username: "mailer".to_owned(),
            smtp_password: SecretString::from("hunter2hunter2"),
            from_address: "orders@maplemart.example".to_owned(),
            staff_address: "staff@maplemart.example".to_owned(),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2hunter2"));
    }
}
