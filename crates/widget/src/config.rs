//! Widget configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FITTING_ROOM_API_BASE_ENDPOINT` - Base URL of the fitting room API
//!
//! ## Optional
//! - `WIDGET_HOST` - Bind address (default: 127.0.0.1)
//! - `WIDGET_PORT` - Listen port (default: 3000)
//! - `WIDGET_BASE_URL` - Public URL of the embedding page (default: <http://localhost:3000>)
//! - `WIDGET_PRODUCT_EAN` - EAN used to resolve the fitting room URL (default: 210000013798)
//! - `WIDGET_BUTTON_TYPE_ID` - Fitting room button type (default: 1)
//! - `WIDGET_CREDITS_DOMAIN` - Domain sent to the credits check (default: zumo-international.com)
//! - `WIDGET_PRODUCT_TITLE` - Sample product title
//! - `WIDGET_PRODUCT_DESCRIPTION` - Sample product description
//! - `WIDGET_PRODUCT_IMAGE_URL` - Sample product image
//! - `FITTING_ROOM_API_TIMEOUT_SECS` - HTTP timeout for API calls (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use fitting_room_core::{ButtonTypeId, Ean};
use thiserror::Error;
use url::Url;

const DEFAULT_EAN: &str = "210000013798";
const DEFAULT_CREDITS_DOMAIN: &str = "zumo-international.com";
const DEFAULT_PRODUCT_TITLE: &str = "Sample Product";
const DEFAULT_PRODUCT_DESCRIPTION: &str = "This is a description of the sample product.";
const DEFAULT_PRODUCT_IMAGE_URL: &str = "https://images.teamshirts.net/image/upload/c_crop,w_3560,h_2670,x_230,y_0/q_auto,fl_lossy,f_auto,w_720/New%20Landingpages/UK/teaser/custom-men-shirt";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Widget application configuration.
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public URL of the page embedding the widget (sent as `origin`)
    pub base_url: String,
    /// Fitting room API configuration
    pub api: ApiConfig,
    /// Sample product and lookup parameters
    pub product: ProductConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Error event sample rate
    pub sentry_sample_rate: f32,
    /// Performance trace sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Fitting room API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base endpoint every gateway path is appended to
    pub base_endpoint: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

/// The product shown by the widget and the keys used to look it up remotely.
#[derive(Debug, Clone)]
pub struct ProductConfig {
    pub ean: Ean,
    pub button_type: ButtonTypeId,
    pub credits_domain: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            ean: Ean::new(DEFAULT_EAN),
            button_type: ButtonTypeId::VIEW,
            credits_domain: DEFAULT_CREDITS_DOMAIN.to_string(),
            title: DEFAULT_PRODUCT_TITLE.to_string(),
            description: DEFAULT_PRODUCT_DESCRIPTION.to_string(),
            image_url: DEFAULT_PRODUCT_IMAGE_URL.to_string(),
        }
    }
}

impl WidgetConfig {
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

        let host = parse_env_or_default::<IpAddr>("WIDGET_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("WIDGET_PORT", "3000")?;
        let base_url = get_env_or_default("WIDGET_BASE_URL", "http://localhost:3000");
        parse_http_url("WIDGET_BASE_URL", &base_url)?;

        let api = ApiConfig::from_env()?;
        let product = ProductConfig::from_env()?;

        Ok(Self {
            host,
            port,
            base_url,
            api,
            product,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
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

impl ApiConfig {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Build an API configuration from a base endpoint string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the endpoint is not an
    /// absolute `http` or `https` URL.
    pub fn new(base_endpoint: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_endpoint: parse_http_url("FITTING_ROOM_API_BASE_ENDPOINT", base_endpoint)?,
            timeout: Self::DEFAULT_TIMEOUT,
        })
    }

    fn from_env() -> Result<Self, ConfigError> {
        let base_endpoint = get_required_env("FITTING_ROOM_API_BASE_ENDPOINT")?;
        let timeout_secs = parse_env_or_default::<u64>("FITTING_ROOM_API_TIMEOUT_SECS", "30")?;

        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            ..Self::new(&base_endpoint)?
        })
    }
}

impl ProductConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            ean: get_optional_env("WIDGET_PRODUCT_EAN").map_or(defaults.ean, Ean::new),
            button_type: ButtonTypeId::new(parse_env_or_default::<u32>(
                "WIDGET_BUTTON_TYPE_ID",
                "1",
            )?),
            credits_domain: get_optional_env("WIDGET_CREDITS_DOMAIN")
                .unwrap_or(defaults.credits_domain),
            title: get_optional_env("WIDGET_PRODUCT_TITLE").unwrap_or(defaults.title),
            description: get_optional_env("WIDGET_PRODUCT_DESCRIPTION")
                .unwrap_or(defaults.description),
            image_url: get_optional_env("WIDGET_PRODUCT_IMAGE_URL").unwrap_or(defaults.image_url),
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

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to a default literal.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse an absolute `http`/`https` URL.
fn parse_http_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}
