//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_PASSWORD` - Shared admin password (min 12 chars, not a placeholder)
//! - `STRIPE_SECRET_KEY` - Stripe secret API key
//! - `STRIPE_WEBHOOK_SECRET` - Stripe webhook signing secret
//! - `RESEND_API_KEY` - Resend API key for notification emails
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (checkout redirects)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `NOTIFICATION_EMAIL` - Where order and contact emails go
//! - `EMAIL_FROM` - Sender for notification emails
//! - `STOREFRONT_DATA_DIR` - Gallery list and maintenance flag (default: data)
//! - `STOREFRONT_UPLOAD_DIR` - Uploaded gallery images (default: public/gallery)
//! - `MAINTENANCE_MODE` - Initial maintenance flag when none is saved (default: false)
//! - `STORE_UTC_OFFSET_HOURS` - Store-local offset from UTC (default: -8)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::{FixedOffset, NaiveDateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_ADMIN_PASSWORD_LENGTH: usize = 12;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Where bakery notifications go unless `NOTIFICATION_EMAIL` is set.
pub const DEFAULT_NOTIFICATION_EMAIL: &str = "sunvillebakerylv@gmail.com";
/// Sender unless `EMAIL_FROM` is set.
pub const DEFAULT_EMAIL_FROM: &str = "Sunville Bakery <onboarding@resend.dev>";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without trailing slash
    pub base_url: String,
    /// Shared admin password
    pub admin_password: SecretString,
    /// Stripe configuration
    pub stripe: StripeConfig,
    /// Notification email configuration
    pub email: EmailConfig,
    /// Directory for the gallery list and maintenance flag
    pub data_dir: PathBuf,
    /// Directory uploaded gallery images are written to and served from
    pub upload_dir: PathBuf,
    /// Maintenance flag used until one is saved
    pub maintenance_default: bool,
    /// Store-local offset from UTC
    pub utc_offset: FixedOffset,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_live_...` / `sk_test_...`)
    pub secret_key: SecretString,
    /// Webhook signing secret (`whsec_...`)
    pub webhook_secret: SecretString,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

/// Notification email configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct EmailConfig {
    /// Resend API key
    pub resend_api_key: SecretString,
    /// Sender shown on notification emails
    pub from: String,
    /// Bakery inbox that receives orders and contact messages
    pub notification_email: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("resend_api_key", &"[REDACTED]")
            .field("from", &self.from)
            .field("notification_email", &self.notification_email)
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

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = parse_base_url(&get_required_env("STOREFRONT_BASE_URL")?)?;

        let admin_password = get_required_secret("ADMIN_PASSWORD")?;
        validate_admin_password(&admin_password, "ADMIN_PASSWORD")?;

        let stripe = StripeConfig::from_env()?;
        let email = EmailConfig::from_env()?;

        let maintenance_default = parse_bool(
            "MAINTENANCE_MODE",
            &get_env_or_default("MAINTENANCE_MODE", "false"),
        )?;
        let utc_offset = parse_utc_offset(&get_env_or_default("STORE_UTC_OFFSET_HOURS", "-8"))?;

        Ok(Self {
            host,
            port,
            base_url,
            admin_password,
            stripe,
            email,
            data_dir: PathBuf::from(get_env_or_default("STOREFRONT_DATA_DIR", "data")),
            upload_dir: PathBuf::from(get_env_or_default(
                "STOREFRONT_UPLOAD_DIR",
                "public/gallery",
            )),
            maintenance_default,
            utc_offset,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Current store-local wall-clock time.
    #[must_use]
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.utc_offset).naive_local()
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            webhook_secret: get_validated_secret("STRIPE_WEBHOOK_SECRET")?,
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            resend_api_key: get_validated_secret("RESEND_API_KEY")?,
            from: get_env_or_default("EMAIL_FROM", DEFAULT_EMAIL_FROM),
            notification_email: get_env_or_default(
                "NOTIFICATION_EMAIL",
                DEFAULT_NOTIFICATION_EMAIL,
            ),
        })
    }
}

/// Load and validate only `STRIPE_SECRET_KEY`.
///
/// Calls `dotenvy::dotenv()` to load from `.env` file if present.
///
/// # Errors
///
/// Returns `ConfigError` if the key is missing or looks like a placeholder.
pub fn stripe_secret_key_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_validated_secret("STRIPE_SECRET_KEY")
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

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate the base URL and strip any trailing slash.
fn parse_base_url(value: &str) -> Result<String, ConfigError> {
    let url = url::Url::parse(value).map_err(|e| {
        ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "STOREFRONT_BASE_URL".to_string(),
            "must be an http or https URL".to_string(),
        ));
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected true or false, got '{other}'"),
        )),
    }
}

/// Parse a whole-hour UTC offset such as `-8`.
fn parse_utc_offset(value: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = |reason: String| {
        ConfigError::InvalidEnvVar("STORE_UTC_OFFSET_HOURS".to_string(), reason)
    };
    let hours = value
        .trim()
        .parse::<i32>()
        .map_err(|e| invalid(e.to_string()))?;
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| invalid(format!("offset out of range: {hours}")))
}

/// Validate the admin password: long enough and not a placeholder.
fn validate_admin_password(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.chars().count() < MIN_ADMIN_PASSWORD_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_ADMIN_PASSWORD_LENGTH,
                value.chars().count()
            ),
        ));
    }
    check_placeholder(value, var_name)
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

fn check_placeholder(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    check_placeholder(secret, var_name)?;

    // Real API keys have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
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
mod tests {
    use super::*;

    fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            admin_password: SecretString::from("correct horse battery"),
            stripe: StripeConfig {
                secret_key: SecretString::from("sk_test_51Hx9QmK2nL5pQ7rT0uW4zC6"),
                webhook_secret: SecretString::from("whsec_aB3xY9mK2nL5pQ7rT0uW4zC6"),
            },
            email: EmailConfig {
                resend_api_key: SecretString::from("re_aB3xY9mK2nL5pQ7rT0uW4"),
                from: DEFAULT_EMAIL_FROM.to_string(),
                notification_email: DEFAULT_NOTIFICATION_EMAIL.to_string(),
            },
            data_dir: PathBuf::from("data"),
            upload_dir: PathBuf::from("public/gallery"),
            maintenance_default: false,
            utc_offset: FixedOffset::west_opt(8 * 3600).unwrap(),
            sentry_dsn: None,
            sentry_environment: None,
        }
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
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-stripe-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("sk_test_51Hx9QmK2nL5pQ7rT0uW4zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_admin_password_too_short() {
        let result = validate_admin_password(&SecretString::from("bun123"), "ADMIN_PASSWORD");
        assert!(result.is_err());
    }

    #[test]
    fn test_admin_password_placeholder() {
        let result = validate_admin_password(
            &SecretString::from("changeme-changeme"),
            "ADMIN_PASSWORD",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_admin_password_valid() {
        let result = validate_admin_password(
            &SecretString::from("ube-pandesal-at-dawn"),
            "ADMIN_PASSWORD",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_base_url() {
        assert_eq!(
            parse_base_url("https://sunvillebakery.com/").unwrap(),
            "https://sunvillebakery.com"
        );
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("ftp://sunvillebakery.com").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "TRUE").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("-8").unwrap().local_minus_utc(), -8 * 3600);
        assert_eq!(parse_utc_offset(" 2 ").unwrap().local_minus_utc(), 2 * 3600);
        assert!(parse_utc_offset("99").is_err());
        assert!(parse_utc_offset("PST").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug_output = format!("{:?}", test_config());

        assert!(debug_output.contains("sunvillebakerylv@gmail.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk_test_51Hx9QmK2nL5pQ7rT0uW4zC6"));
        assert!(!debug_output.contains("whsec_aB3xY9mK2nL5pQ7rT0uW4zC6"));
        assert!(!debug_output.contains("re_aB3xY9mK2nL5pQ7rT0uW4"));
        assert!(!debug_output.contains("correct horse battery"));
    }
}
