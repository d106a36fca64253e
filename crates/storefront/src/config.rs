//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `BACKEND_URL` - Hosted backend project URL
//! - `BACKEND_ANON_KEY` - Hosted backend public key
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `BACKEND_SERVICE_ROLE_KEY` - Not needed by the storefront
//! - `TRYON_API_BASE_URL` - Task-based try-on API (default: <https://api.klingai.com>)
//! - `TRYON_API_KEY` - Task-based try-on API key; try-on via this provider is
//!   disabled without it
//! - `TRYON_MODEL` - Model name sent when creating tasks (default: kolors-virtual-try-on-v1-5)
//! - `TRYON_POLL_INTERVAL_MS` - Delay between status polls (default: 2000)
//! - `TRYON_MAX_POLL_ATTEMPTS` - Polls before giving up (default: 60)
//! - `IMAGE_GEN_API_BASE_URL` - Chat-completion image API (default: <https://openrouter.ai/api/v1>)
//! - `IMAGE_GEN_API_KEY` - Image generation API key
//! - `IMAGE_GEN_MODEL` - Image generation model
//! - `SHIPPING_FLAT_RATE` - Shipping below the threshold (default: 9.99)
//! - `FREE_SHIPPING_THRESHOLD` - Free shipping at or above this subtotal (default: 100, `none` disables)
//! - `SALES_TAX_RATE` - Tax as a fraction of the subtotal (default: 0)
//! - `TRUST_PROXY_HEADERS` - Rate-limit on `X-Forwarded-For` and friends;
//!   only set behind a proxy that overwrites them (default: false)
//! - `LOG_FORMAT` - `json` for JSON log lines (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use url::Url;
use vesture_backend::BackendConfig;
use vesture_backend::config::{
    get_env_or_default, get_optional_env, get_optional_validated_secret, get_required_env,
    parse_env, parse_env_or_default,
};
use vesture_core::ShippingPolicy;

pub use vesture_backend::ConfigError;

const DEFAULT_TRYON_API_BASE_URL: &str = "https://api.klingai.com";
const DEFAULT_TRYON_MODEL: &str = "kolors-virtual-try-on-v1-5";
const DEFAULT_IMAGE_GEN_API_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_IMAGE_GEN_MODEL: &str = "google/gemini-2.5-flash-image-preview";

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Hosted backend connection
    pub backend: BackendConfig,
    /// Virtual try-on providers
    pub tryon: TryOnConfig,
    /// Shipping and tax rules
    pub shipping: ShippingPolicy,
    /// Key rate limits on proxy headers instead of the peer address
    pub trust_proxy_headers: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Virtual try-on provider settings.
#[derive(Debug, Clone)]
pub struct TryOnConfig {
    pub task_api: TaskApiConfig,
    pub image_gen: ImageGenConfig,
}

/// Task-based try-on API (create task, poll, download).
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct TaskApiConfig {
    pub base_url: Url,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl std::fmt::Debug for TaskApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .finish()
    }
}

/// Chat-completion image generation API.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ImageGenConfig {
    pub base_url: Url,
    pub api_key: Option<SecretString>,
    pub model: String,
}

impl std::fmt::Debug for ImageGenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageGenConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .finish()
    }
}

impl StorefrontConfig {
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

        Ok(Self {
            host: parse_env_or_default("STOREFRONT_HOST", "127.0.0.1")?,
            port: parse_env_or_default("STOREFRONT_PORT", "3000")?,
            base_url: get_required_env("STOREFRONT_BASE_URL")?,
            backend: BackendConfig::from_env()?,
            tryon: TryOnConfig::from_env()?,
            shipping: shipping_policy_from_env()?,
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

impl TryOnConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let task_api = TaskApiConfig {
            base_url: parse_env_or_default("TRYON_API_BASE_URL", DEFAULT_TRYON_API_BASE_URL)?,
            api_key: get_optional_validated_secret("TRYON_API_KEY")?,
            model: get_env_or_default("TRYON_MODEL", DEFAULT_TRYON_MODEL),
            poll_interval: Duration::from_millis(parse_env_or_default(
                "TRYON_POLL_INTERVAL_MS",
                "2000",
            )?),
            max_poll_attempts: parse_env_or_default("TRYON_MAX_POLL_ATTEMPTS", "60")?,
        };
        if task_api.max_poll_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "TRYON_MAX_POLL_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let image_gen = ImageGenConfig {
            base_url: parse_env_or_default(
                "IMAGE_GEN_API_BASE_URL",
                DEFAULT_IMAGE_GEN_API_BASE_URL,
            )?,
            api_key: get_optional_validated_secret("IMAGE_GEN_API_KEY")?,
            model: get_env_or_default("IMAGE_GEN_MODEL", DEFAULT_IMAGE_GEN_MODEL),
        };

        Ok(Self {
            task_api,
            image_gen,
        })
    }
}

fn shipping_policy_from_env() -> Result<ShippingPolicy, ConfigError> {
    let defaults = ShippingPolicy::default();

    let free_shipping_threshold = match get_optional_env("FREE_SHIPPING_THRESHOLD") {
        None => defaults.free_shipping_threshold,
        Some(value) if value.eq_ignore_ascii_case("none") => None,
        Some(value) => Some(parse_env::<Decimal>("FREE_SHIPPING_THRESHOLD", &value)?),
    };

    let policy = ShippingPolicy {
        flat_rate: get_optional_env("SHIPPING_FLAT_RATE")
            .map(|v| parse_env("SHIPPING_FLAT_RATE", &v))
            .transpose()?
            .unwrap_or(defaults.flat_rate),
        free_shipping_threshold,
        tax_rate: get_optional_env("SALES_TAX_RATE")
            .map(|v| parse_env("SALES_TAX_RATE", &v))
            .transpose()?
            .unwrap_or(defaults.tax_rate),
    };

    if policy.flat_rate.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            "SHIPPING_FLAT_RATE".to_string(),
            "must not be negative".to_string(),
        ));
    }
    if policy.tax_rate.is_sign_negative() || policy.tax_rate >= Decimal::ONE {
        return Err(ConfigError::InvalidEnvVar(
            "SALES_TAX_RATE".to_string(),
            "must be a fraction between 0 and 1".to_string(),
        ));
    }

    Ok(policy)
}
