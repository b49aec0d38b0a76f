//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `VOLTCART_API_BASE_URL` - REST API root (default: `http://localhost:5000/api`)
//! - `VOLTCART_CREDENTIAL_PATH` - File holding the bearer credential
//!   (default: `$HOME/.voltcart/credential`)
//! - `VOLTCART_REQUEST_TIMEOUT_SECS` - Transport timeout; unset means the
//!   `reqwest` default (none)
//! - `VOLTCART_MERCHANT_NAME` - Merchant name shown by the payment gateway
//!   (default: `VoltCart Electricals`)
//! - `VOLTCART_THEME_COLOR` - Gateway accent colour (default: `#0B1F3B`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
const DEFAULT_MERCHANT_NAME: &str = "VoltCart Electricals";
const DEFAULT_THEME_COLOR: &str = "#0B1F3B";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Top-level client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST API connection settings
    pub api: ApiConfig,
    /// Where the one durable credential lives
    pub credential_path: PathBuf,
    /// Payment gateway presentation
    pub checkout: CheckoutConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// REST API connection settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API root; always ends with `/` so relative joins keep the prefix.
    pub base_url: Url,
    /// Transport timeout, if any.
    pub timeout: Option<Duration>,
}

/// Presentation options passed through to the payment gateway.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub merchant_name: String,
    pub theme_color: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            merchant_name: DEFAULT_MERCHANT_NAME.to_string(),
            theme_color: DEFAULT_THEME_COLOR.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid, or if no
    /// credential path can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::from_env()?;
        let credential_path = match get_optional_env("VOLTCART_CREDENTIAL_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_credential_path()?,
        };

        Ok(Self {
            api,
            credential_path,
            checkout: CheckoutConfig {
                merchant_name: get_env_or_default("VOLTCART_MERCHANT_NAME", DEFAULT_MERCHANT_NAME),
                theme_color: get_env_or_default("VOLTCART_THEME_COLOR", DEFAULT_THEME_COLOR),
            },
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl ApiConfig {
    /// Build from an explicit base URL with no timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL does not parse or is
    /// not http(s).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("VOLTCART_API_BASE_URL", base_url)?,
            timeout: None,
        })
    }

    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_env_or_default("VOLTCART_API_BASE_URL", DEFAULT_API_BASE_URL);
        let base_url = parse_base_url("VOLTCART_API_BASE_URL", &raw)?;

        let timeout = get_optional_env("VOLTCART_REQUEST_TIMEOUT_SECS")
            .map(|secs| {
                secs.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "VOLTCART_REQUEST_TIMEOUT_SECS".to_string(),
                        e.to_string(),
                    )
                })
            })
            .transpose()?;

        Ok(Self { base_url, timeout })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an API root, forcing a trailing slash.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(&format!("{trimmed}/"))
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

fn default_credential_path() -> Result<PathBuf, ConfigError> {
    let home = get_optional_env("HOME")
        .or_else(|| get_optional_env("USERPROFILE"))
        .ok_or_else(|| ConfigError::MissingEnvVar("VOLTCART_CREDENTIAL_PATH".to_string()))?;
    Ok(PathBuf::from(home).join(".voltcart").join("credential"))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let url = parse_base_url("K", "https://api.voltcart.in/api").unwrap();
        assert_eq!(url.as_str(), "https://api.voltcart.in/api/");
        assert_eq!(url.join("cart").unwrap().path(), "/api/cart");
    }

    #[test]
    fn test_base_url_collapses_extra_slashes() {
        let url = parse_base_url("K", "http://localhost:5000/api///").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/");
    }

    #[test]
    fn test_base_url_rejects_other_schemes() {
        let err = parse_base_url("K", "ftp://files.example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
        assert!(parse_base_url("K", "not a url").is_err());
    }

    #[test]
    fn test_checkout_defaults() {
        let checkout = CheckoutConfig::default();
        assert_eq!(checkout.merchant_name, "VoltCart Electricals");
        assert_eq!(checkout.theme_color, "#0B1F3B");
    }
}
