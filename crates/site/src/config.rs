//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SITE_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `SITE_BASE_URL` - Public URL for the site
//! - `ADMIN_EMAIL` - The single operator address allowed into the admin API
//!
//! ## Optional
//! - `SITE_HOST` - Bind address (default: 127.0.0.1)
//! - `SITE_PORT` - Listen port (default: 3000)
//! - `APP_ENV` - `development` or `production` (default: development)
//! - `RATE_LIMIT_BACKEND` - `memory` or `redis` (default: memory)
//! - `REDIS_URL` - Redis connection string, required for the redis backend
//! - `RATE_LIMIT_FAIL_MODE` - `open` or `closed` (default: open)
//! - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET` -
//!   image store credentials; image uploads return 503 when unset
//! - `CLOUDINARY_FOLDER` - Upload folder (default: redline/blog)
//! - `PAGE_CACHE_TTL_SECONDS` - Rendered page cache TTL (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use redline_core::Email;
use secrecy::SecretString;
use thiserror::Error;

use crate::services::rate_limit::FailMode;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "insert",
    "put-your",
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

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" | "test" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!("expected development or production, got {s}")),
        }
    }
}

/// Where rate-limit counters live.
#[derive(Debug, Clone)]
pub enum RateLimitBackend {
    /// Per-process counters. Each instance enforces limits independently.
    Memory,
    /// Shared counters in Redis, consistent across instances.
    Redis { url: SecretString },
}

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub backend: RateLimitBackend,
    pub fail_mode: FailMode,
    /// Key prefix for the redis backend.
    pub key_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            backend: RateLimitBackend::Memory,
            fail_mode: FailMode::Open,
            key_prefix: "redline".to_string(),
        }
    }
}

/// Cloudinary image store configuration.
///
/// Implements `Debug` manually to redact the API secret.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
    pub folder: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("folder", &self.folder)
            .finish()
    }
}

/// Site application configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the site
    pub base_url: String,
    /// Deployment environment
    pub environment: Environment,
    /// The single operator identity allowed into the admin API
    pub admin_email: Email,
    /// Rate limiter backend and failure policy
    pub rate_limit: RateLimitConfig,
    /// Image store credentials, if configured
    pub cloudinary: Option<CloudinaryConfig>,
    /// TTL for cached public pages
    pub page_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SITE_DATABASE_URL")?;
        let host = get_env_or_default("SITE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SITE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SITE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SITE_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("SITE_BASE_URL")?;
        let environment = get_env_or_default("APP_ENV", "development")
            .parse::<Environment>()
            .map_err(|e| ConfigError::InvalidEnvVar("APP_ENV".to_string(), e))?;
        let admin_email = Email::parse(&get_required_env("ADMIN_EMAIL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_EMAIL".to_string(), e.to_string()))?;

        let rate_limit = RateLimitConfig::from_env()?;
        let cloudinary = CloudinaryConfig::from_env()?;

        let page_cache_ttl = get_env_or_default("PAGE_CACHE_TTL_SECONDS", "300")
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("PAGE_CACHE_TTL_SECONDS".to_string(), e.to_string())
            })?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            environment,
            admin_email,
            rate_limit,
            cloudinary,
            page_cache_ttl,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.environment.is_production() || self.base_url.starts_with("https://")
    }

    /// Whether internal error details may be shown to clients.
    #[must_use]
    pub const fn expose_error_details(&self) -> bool {
        !self.environment.is_production()
    }
}

impl RateLimitConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend = match get_env_or_default("RATE_LIMIT_BACKEND", "memory")
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => RateLimitBackend::Memory,
            "redis" => RateLimitBackend::Redis {
                url: SecretString::from(get_required_env("REDIS_URL")?),
            },
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "RATE_LIMIT_BACKEND".to_string(),
                    format!("expected memory or redis, got {other}"),
                ));
            }
        };

        let fail_mode = match get_env_or_default("RATE_LIMIT_FAIL_MODE", "open")
            .to_ascii_lowercase()
            .as_str()
        {
            "open" => FailMode::Open,
            "closed" => FailMode::Closed,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "RATE_LIMIT_FAIL_MODE".to_string(),
                    format!("expected open or closed, got {other}"),
                ));
            }
        };

        Ok(Self {
            backend,
            fail_mode,
            key_prefix: get_env_or_default("RATE_LIMIT_KEY_PREFIX", "redline"),
        })
    }
}

impl CloudinaryConfig {
    /// All three credentials must be set together; none set disables uploads.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(cloud_name) = get_optional_env("CLOUDINARY_CLOUD_NAME") else {
            return Ok(None);
        };

        Ok(Some(Self {
            cloud_name,
            api_key: get_required_env("CLOUDINARY_API_KEY")?,
            api_secret: get_validated_secret("CLOUDINARY_API_SECRET")?,
            folder: get_env_or_default("CLOUDINARY_FOLDER", "redline/blog"),
        }))
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

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
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
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
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

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// A development configuration for unit tests.
    pub(crate) fn test_config() -> SiteConfig {
        SiteConfig {
            database_url: SecretString::from("postgres://localhost/redline_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: Environment::Development,
            admin_email: Email::parse("owner@redline.test").unwrap(),
            rate_limit: RateLimitConfig::default(),
            cloudinary: None,
            page_cache_ttl: Duration::from_secs(300),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(matches!(
            validate_secret_strength("your-api-secret-here", "TEST_VAR"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR").is_err());
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(
            "Production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_secure_cookies() {
        let mut config = test_config();
        assert!(!config.secure_cookies());

        config.base_url = "https://redline.example".to_string();
        assert!(config.secure_cookies());

        config.base_url = "http://localhost:3000".to_string();
        config.environment = Environment::Production;
        assert!(config.secure_cookies());
        assert!(!config.expose_error_details());
    }

    #[test]
    fn test_cloudinary_debug_redacts_secret() {
        let config = CloudinaryConfig {
            cloud_name: "redline".to_string(),
            api_key: "1234".to_string(),
            api_secret: SecretString::from("s3cr3t-value"),
            folder: "redline/blog".to_string(),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("s3cr3t-value"));
    }

    #[test]
    fn test_socket_addr() {
        let config = test_config();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
    }
}
