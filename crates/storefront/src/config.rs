//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SHOP_DATA_DIR` - Directory for persisted catalog and cart (default: .leather-shop)
//! - `SHOP_CATALOG_SOURCE` - Catalog bootstrap document, path or http(s) URL
//!   (default: data/products.json)
//! - `SHOP_ZIP_TABLE` - JSON zip table replacing the built-in one
//! - `SHOP_SUBMIT_DELAY_MS` - Checkout processing delay (default: 1500)
//! - `ORDER_API_URL` - Order backend base URL; orders are simulated when unset
//! - `ORDER_API_TOKEN` - Order backend bearer token (required with `ORDER_API_URL`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::checkout::DEFAULT_SUBMIT_DELAY;

const DEFAULT_DATA_DIR: &str = ".leather-shop";
const DEFAULT_CATALOG_SOURCE: &str = "data/products.json";
const MIN_TOKEN_LENGTH: usize = 16;
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
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Directory holding the persisted catalog snapshot and cart
    pub data_dir: PathBuf,
    /// Catalog bootstrap document (path or URL)
    pub catalog_source: String,
    /// Operator-supplied zip table
    pub zip_table: Option<PathBuf>,
    /// Checkout processing delay
    pub submit_delay: Duration,
    /// Order backend; `None` means orders are simulated
    pub order_api: Option<OrderApiConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Order backend configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct OrderApiConfig {
    /// Base URL; orders are POSTed to `{base_url}/orders`
    pub base_url: Url,
    /// Bearer token
    pub token: SecretString,
}

impl std::fmt::Debug for OrderApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            catalog_source: DEFAULT_CATALOG_SOURCE.to_string(),
            zip_table: None,
            submit_delay: DEFAULT_SUBMIT_DELAY,
            order_api: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid, `ORDER_API_URL` is set
    /// without a token, or the token fails validation (placeholder detection,
    /// entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`StorefrontConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let data_dir = PathBuf::from(env.or_default("SHOP_DATA_DIR", DEFAULT_DATA_DIR));
        let catalog_source = env.or_default("SHOP_CATALOG_SOURCE", DEFAULT_CATALOG_SOURCE);
        let zip_table = env.optional("SHOP_ZIP_TABLE").map(PathBuf::from);

        let submit_delay = match env.optional("SHOP_SUBMIT_DELAY_MS") {
            Some(raw) => raw.parse::<u64>().map(Duration::from_millis).map_err(|e| {
                ConfigError::InvalidEnvVar("SHOP_SUBMIT_DELAY_MS".to_string(), e.to_string())
            })?,
            None => DEFAULT_SUBMIT_DELAY,
        };

        let order_api = OrderApiConfig::from_env(&env)?;

        Ok(Self {
            data_dir,
            catalog_source,
            zip_table,
            submit_delay,
            order_api,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }
}

impl OrderApiConfig {
    fn from_env<F: Fn(&str) -> Option<String>>(env: &Env<'_, F>) -> Result<Option<Self>, ConfigError> {
        let Some(raw_url) = env.optional("ORDER_API_URL") else {
            return Ok(None);
        };

        let base_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("ORDER_API_URL".to_string(), e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "ORDER_API_URL".to_string(),
                format!("unsupported scheme '{}'", base_url.scheme()),
            ));
        }

        let token = env.validated_secret("ORDER_API_TOKEN")?;
        Ok(Some(Self { base_url, token }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the usual accessors. Empty values count as unset.
struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
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

/// Validate that a secret is long enough, not a placeholder, and has
/// sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_TOKEN_LENGTH} characters (got {})",
                secret.len()
            ),
        ));
    }

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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated token."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    const TOKEN: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6";

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from(".leather-shop"));
        assert_eq!(config.catalog_source, "data/products.json");
        assert_eq!(config.submit_delay, Duration::from_millis(1500));
        assert!(config.zip_table.is_none());
        assert!(config.order_api.is_none());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SHOP_DATA_DIR", "/var/lib/shop"),
            ("SHOP_CATALOG_SOURCE", "https://cdn.example.net/products.json"),
            ("SHOP_ZIP_TABLE", "/etc/shop/zips.json"),
            ("SHOP_SUBMIT_DELAY_MS", "0"),
            ("SENTRY_ENVIRONMENT", "staging"),
        ])
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/shop"));
        assert_eq!(config.zip_table, Some(PathBuf::from("/etc/shop/zips.json")));
        assert_eq!(config.submit_delay, Duration::ZERO);
        assert_eq!(config.sentry_environment.as_deref(), Some("staging"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = load(&[("SHOP_DATA_DIR", "  "), ("SENTRY_DSN", "")]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from(".leather-shop"));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_invalid_delay() {
        let err = load(&[("SHOP_SUBMIT_DELAY_MS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "SHOP_SUBMIT_DELAY_MS"));
    }

    #[test]
    fn test_order_api() {
        let config = load(&[
            ("ORDER_API_URL", "https://orders.leather.test/v1"),
            ("ORDER_API_TOKEN", TOKEN),
        ])
        .unwrap();

        let api = config.order_api.unwrap();
        assert_eq!(api.base_url.as_str(), "https://orders.leather.test/v1");
        assert_eq!(api.token.expose_secret(), TOKEN);
    }

    #[test]
    fn test_order_api_requires_token() {
        let err = load(&[("ORDER_API_URL", "https://orders.leather.test")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "ORDER_API_TOKEN"));
    }

    #[test]
    fn test_order_api_rejects_bad_url() {
        for url in ["not a url", "ftp://orders.leather.test"] {
            let err = load(&[("ORDER_API_URL", url), ("ORDER_API_TOKEN", TOKEN)]).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)), "{url}");
        }
    }

    #[test]
    fn test_order_api_rejects_placeholder_token() {
        let err = load(&[
            ("ORDER_API_URL", "https://orders.leather.test"),
            ("ORDER_API_TOKEN", "your-order-api-token-here"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(validate_secret_strength("short", "T").is_err());
        assert!(validate_secret_strength("changeme1234567890", "T").is_err());
        assert!(validate_secret_strength(&"a".repeat(40), "T").is_err());
        assert!(validate_secret_strength(TOKEN, "T").is_ok());
    }

    #[test]
    fn test_order_api_debug_redacts_token() {
        let config = OrderApiConfig {
            base_url: Url::parse("https://orders.leather.test").unwrap(),
            token: SecretString::from("super_secret_order_token"),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("orders.leather.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_order_token"));
    }
}
