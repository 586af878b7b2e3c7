//! Server configuration.
//!
//! App identity comes from `config.json` (the file the setup tooling
//! generates and consumes); deployment concerns come from environment
//! variables. Both are loaded once at startup into explicit structs and
//! passed by reference - handlers never read the environment.
//!
//! # Config file (`config.json`)
//!
//! Required string fields: `client_id`, `merchant_id`, `shop_id`,
//! `app_url`, `scopes`, `redirect_url`.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_CLIENT_SECRET` - App client secret (webhook HMAC, token exchange)
//! - `MAGIC_CHECKOUT_DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `MAGIC_CHECKOUT_CONFIG` - Path to config.json (default: config.json)
//! - `MAGIC_CHECKOUT_HOST` - Bind address (default: 127.0.0.1)
//! - `MAGIC_CHECKOUT_PORT` - Listen port (default: 3458)
//! - `RELAY_URL` - Base URL of the backend relay (unset: log-only relay)
//! - `RELAY_API_KEY` - Bearer token for relay calls
//! - `RELAY_TIMEOUT_SECS` - Relay request timeout (default: 5)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Default relay request timeout in seconds.
const DEFAULT_RELAY_TIMEOUT_SECS: u64 = 5;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in config file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Missing required config fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("Invalid shop_id {0:?}: cannot build authorize URL")]
    InvalidShopId(String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// App identity loaded from `config.json`.
    pub install: InstallConfig,
    /// IP address to bind the server to.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// `PostgreSQL` database connection URL (contains password).
    pub database_url: SecretString,
    /// Shopify app client secret (signs webhook deliveries).
    pub client_secret: SecretString,
    /// Backend relay configuration.
    pub relay: RelayConfig,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
}

/// App identity read from `config.json`.
#[derive(Debug, Clone)]
pub struct InstallConfig {
    /// OAuth client id.
    pub client_id: String,
    /// Merchant identifier, carried as the OAuth `state` parameter.
    pub merchant_id: String,
    /// Shop handle the install button targets (fixed per deployment).
    pub shop_id: String,
    /// Public URL of this app.
    pub app_url: String,
    /// Comma-joined access scopes requested at install.
    pub scopes: String,
    /// OAuth redirect URL registered with Shopify.
    pub redirect_url: String,
}

/// Backend relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Base URL of the external backend. When unset the relay only logs.
    pub base_url: Option<String>,
    /// Bearer token for relay calls.
    pub api_key: Option<SecretString>,
    /// Upper bound on each relay request.
    pub timeout: Duration,
}

impl AppConfig {
    /// Load configuration from `config.json` and environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file is missing or malformed,
    /// required fields or variables are absent, or values fail to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config_path = get_env_or_default("MAGIC_CHECKOUT_CONFIG", "config.json");
        let install = InstallConfig::from_path(Path::new(&config_path))?;
        // Fail fast on an unbuildable authorize URL rather than at first request
        install.authorize_url()?;

        let host = get_env_or_default("MAGIC_CHECKOUT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MAGIC_CHECKOUT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("MAGIC_CHECKOUT_PORT", "3458")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MAGIC_CHECKOUT_PORT".to_string(), e.to_string())
            })?;
        let database_url = get_database_url("MAGIC_CHECKOUT_DATABASE_URL")?;
        let client_secret = get_required_secret("SHOPIFY_CLIENT_SECRET")?;
        let relay = RelayConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            install,
            host,
            port,
            database_url,
            client_secret,
            relay,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Raw shape of `config.json` before required-field validation.
#[derive(Debug, Deserialize)]
struct RawInstallConfig {
    client_id: Option<String>,
    merchant_id: Option<String>,
    shop_id: Option<String>,
    app_url: Option<String>,
    scopes: Option<String>,
    redirect_url: Option<String>,
}

impl InstallConfig {
    /// Read and validate `config.json`.
    ///
    /// All six fields are required and must be non-empty. Validation
    /// collects every missing field before failing so the error names
    /// the complete set, not just the first one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read,
    /// `ConfigError::Json` if it is not valid JSON, and
    /// `ConfigError::MissingFields` listing absent or empty fields.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let raw: RawInstallConfig =
            serde_json::from_str(&data).map_err(|source| ConfigError::Json {
                path: display,
                source,
            })?;

        let mut missing = Vec::new();
        let mut take = |value: Option<String>, name: &str| {
            match value {
                Some(v) if !v.is_empty() => v,
                // Empty strings count as missing, matching the setup tooling
                _ => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        };

        let config = Self {
            client_id: take(raw.client_id, "client_id"),
            merchant_id: take(raw.merchant_id, "merchant_id"),
            shop_id: take(raw.shop_id, "shop_id"),
            app_url: take(raw.app_url, "app_url"),
            scopes: take(raw.scopes, "scopes"),
            redirect_url: take(raw.redirect_url, "redirect_url"),
        };

        if missing.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::MissingFields(missing))
        }
    }

    /// Build the OAuth authorize URL for installing the app.
    ///
    /// `https://{shop_id}.myshopify.com/admin/oauth/authorize` with
    /// `client_id`, `redirect_uri`, `state={merchant_id}` and
    /// `response_type=code` as properly encoded query parameters.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidShopId` if `shop_id` does not form a
    /// valid URL host.
    pub fn authorize_url(&self) -> Result<Url, ConfigError> {
        let base = format!(
            "https://{}.myshopify.com/admin/oauth/authorize",
            self.shop_id
        );
        let mut url =
            Url::parse(&base).map_err(|_| ConfigError::InvalidShopId(self.shop_id.clone()))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("state", &self.merchant_id)
            .append_pair("response_type", "code");
        Ok(url)
    }
}

impl RelayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = get_env_or_default(
            "RELAY_TIMEOUT_SECS",
            &DEFAULT_RELAY_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar("RELAY_TIMEOUT_SECS".to_string(), e.to_string()))?;

        Ok(Self {
            base_url: get_optional_env("RELAY_URL"),
            api_key: get_optional_env("RELAY_API_KEY").map(SecretString::from),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
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
