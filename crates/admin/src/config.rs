//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_BASE_URL` - Public URL for the admin panel
//! - `BACKEND_URL` - Hosted backend project URL
//! - `BACKEND_ANON_KEY` - Hosted backend public key (used for password sign-in)
//! - `BACKEND_SERVICE_ROLE_KEY` - Hosted backend service key (HIGH PRIVILEGE)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_LOW_STOCK_THRESHOLD` - Stock level below which the dashboard flags a product (default: 5)
//! - `TRUST_PROXY_HEADERS` - Rate-limit sign-in on proxy headers instead of the peer address (default: false)
//! - `LOG_FORMAT` - `json` for JSON log lines (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};

use vesture_backend::BackendConfig;
use vesture_backend::config::{get_optional_env, get_required_env, parse_env_or_default};

pub use vesture_backend::ConfigError;

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin panel
    pub base_url: String,
    /// Hosted backend connection; always carries the service key
    pub backend: BackendConfig,
    /// Products with less stock than this show up on the dashboard
    pub low_stock_threshold: i32,
    /// Key the sign-in rate limit on proxy headers instead of the peer address
    pub trust_proxy_headers: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation. Unlike the storefront, the service key is
    /// required here.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let backend = BackendConfig::from_env()?;
        if backend.service_role_key.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "BACKEND_SERVICE_ROLE_KEY".to_string(),
            ));
        }

        Ok(Self {
            host: parse_env_or_default("ADMIN_HOST", "127.0.0.1")?,
            port: parse_env_or_default("ADMIN_PORT", "3001")?,
            base_url: get_required_env("ADMIN_BASE_URL")?,
            backend,
            low_stock_threshold: parse_env_or_default("ADMIN_LOW_STOCK_THRESHOLD", "5")?,
            trust_proxy_headers: parse_env_or_default("TRUST_PROXY_HEADERS", "false")?,
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
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}
