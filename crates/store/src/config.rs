//! Store configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPCART_API_URL` - Base URL of the storefront backend (e.g., `https://api.example.com`)
//!
//! ## Optional
//! - `SHOPCART_STATE_PATH` - File holding the persisted cart blob (default: cart-storage.json)
//! - `SHOPCART_REQUEST_TIMEOUT_SECS` - Per-request timeout in seconds (default: 15)
//! - `SHOPCART_SESSION_COOKIE` - Session cookie sent with every backend call
//! - `SHOPCART_USER_ID` - Signed-in user identifier
//! - `SHOPCART_CURRENCY` - ISO 4217 code used to display totals (default: NGN)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use shopcart_core::{CurrencyCode, UserId};
use thiserror::Error;
use url::Url;

use crate::models::Session;

const DEFAULT_STATE_PATH: &str = "cart-storage.json";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart store configuration.
///
/// Implements `Debug` manually to redact the session cookie.
#[derive(Clone)]
pub struct StoreConfig {
    /// Backend base URL; endpoint paths are appended to it
    pub api_url: Url,
    /// Where the persisted cart blob lives
    pub state_path: PathBuf,
    /// Timeout applied to each backend request
    pub request_timeout: Duration,
    /// Session cookie carrying the backend credentials
    pub session_cookie: Option<SecretString>,
    /// Signed-in user, if known
    pub user_id: Option<UserId>,
    /// Currency used when displaying totals
    pub currency: CurrencyCode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("api_url", &self.api_url.as_str())
            .field("state_path", &self.state_path)
            .field("request_timeout", &self.request_timeout)
            .field(
                "session_cookie",
                &self.session_cookie.as_ref().map(|_| "[REDACTED]"),
            )
            .field("user_id", &self.user_id)
            .field("currency", &self.currency)
            .field("sentry_dsn", &self.sentry_dsn)
            .finish()
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_required_env("SHOPCART_API_URL")?)?;
        let state_path =
            PathBuf::from(get_env_or_default("SHOPCART_STATE_PATH", DEFAULT_STATE_PATH));
        let timeout_secs = get_env_or_default(
            "SHOPCART_REQUEST_TIMEOUT_SECS",
            &DEFAULT_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("SHOPCART_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
        })?;
        let currency = get_env_or_default("SHOPCART_CURRENCY", "NGN")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHOPCART_CURRENCY".to_string(), e.to_string()))?;

        Ok(Self {
            api_url,
            state_path,
            request_timeout: Duration::from_secs(timeout_secs),
            session_cookie: get_optional_env("SHOPCART_SESSION_COOKIE").map(SecretString::from),
            user_id: get_optional_env("SHOPCART_USER_ID").map(UserId::from),
            currency,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Configuration pointing at `api_url` with every optional value defaulted.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_cookie: None,
            user_id: None,
            currency: CurrencyCode::default(),
            sentry_dsn: None,
        }
    }

    /// Session for the configured user, if one is set.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.user_id.clone().map(|user_id| Session { user_id })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and sanity-check the backend base URL.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("SHOPCART_API_URL".to_string(), e.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "SHOPCART_API_URL".to_string(),
            "must be an http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
