//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BACKEND_URL` - Base URL of the hosted backend project (e.g. `https://abc.supabase.co`)
//! - `BACKEND_ANON_KEY` - Public (row-level-secured) API key
//!
//! ## Optional
//! - `BACKEND_SERVICE_KEY` - Service role key for operator tooling
//! - `EMAIL_SERVICE_ID`, `EMAIL_TEMPLATE_ID`, `EMAIL_PUBLIC_KEY`,
//!   `EMAIL_FROM_ADDRESS`, `EMAIL_FROM_NAME` - Email relay (all or none)
//! - `CONTACT_WHATSAPP_NUMBER` - Number the contact form deep-links to
//! - `DEFAULT_PAGE_SIZE` - Rows per page for list views (default: 10)
//! - `SEARCH_DEBOUNCE_MS` - Admin search debounce window (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const MAX_PAGE_SIZE: u32 = 100;

/// Rows per page when `DEFAULT_PAGE_SIZE` is unset.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Admin search debounce when `SEARCH_DEBOUNCE_MS` is unset.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

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

const EMAIL_KEYS: [&str; 5] = [
    "EMAIL_SERVICE_ID",
    "EMAIL_TEMPLATE_ID",
    "EMAIL_PUBLIC_KEY",
    "EMAIL_FROM_ADDRESS",
    "EMAIL_FROM_NAME",
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

/// Marketplace client configuration.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Hosted backend connection
    pub backend: BackendConfig,
    /// Email relay, if transactional email is enabled
    pub email: Option<EmailRelayConfig>,
    /// Messaging number used by the contact form deep link
    pub contact_whatsapp_number: Option<String>,
    /// Default rows per page for list views
    pub default_page_size: u32,
    /// Debounce window for admin search-as-you-type
    pub search_debounce: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Hosted backend connection settings.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct BackendConfig {
    /// Project base URL; REST lives under `/rest/v1`
    pub url: Url,
    /// Public API key, sent as `apikey` and bearer token
    pub anon_key: SecretString,
    /// Service role key, bypasses row-level security
    pub service_key: Option<SecretString>,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field(
                "service_key",
                &self.service_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl BackendConfig {
    /// The key to authenticate with: the service key when present.
    #[must_use]
    pub fn api_key(&self) -> &SecretString {
        self.service_key.as_ref().unwrap_or(&self.anon_key)
    }
}

/// Transactional email relay settings (service/template/public-key triple).
#[derive(Debug, Clone)]
pub struct EmailRelayConfig {
    pub service_id: String,
    pub template_id: String,
    /// Relay public key; identifies the account, not a secret
    pub public_key: String,
    pub from_address: String,
    pub from_name: String,
}

impl MarketConfig {
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
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`MarketConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let backend = BackendConfig::from_env(&env)?;
        let email = EmailRelayConfig::from_env(&env)?;

        let default_page_size = env
            .optional("DEFAULT_PAGE_SIZE")
            .map_or(Ok(DEFAULT_PAGE_SIZE), |v| v.parse::<u32>())
            .map_err(|e| ConfigError::InvalidEnvVar("DEFAULT_PAGE_SIZE".into(), e.to_string()))?;
        if default_page_size == 0 || default_page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidEnvVar(
                "DEFAULT_PAGE_SIZE".into(),
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        let search_debounce = env
            .optional("SEARCH_DEBOUNCE_MS")
            .map(|v| v.parse::<u64>().map(Duration::from_millis))
            .transpose()
            .map_err(|e| ConfigError::InvalidEnvVar("SEARCH_DEBOUNCE_MS".into(), e.to_string()))?
            .unwrap_or(DEFAULT_SEARCH_DEBOUNCE);

        Ok(Self {
            backend,
            email,
            contact_whatsapp_number: env.optional("CONTACT_WHATSAPP_NUMBER"),
            default_page_size,
            search_debounce,
            sentry_dsn: env.optional("SENTRY_DSN"),
        })
    }
}

impl BackendConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let raw_url = env.required("BACKEND_URL")?;
        let url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_URL".into(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "BACKEND_URL".into(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        let service_key = match env.optional("BACKEND_SERVICE_KEY") {
            Some(value) => Some(validated_secret("BACKEND_SERVICE_KEY", value)?),
            None => None,
        };

        Ok(Self {
            url,
            anon_key: validated_secret("BACKEND_ANON_KEY", env.required("BACKEND_ANON_KEY")?)?,
            service_key,
        })
    }
}

impl EmailRelayConfig {
    fn from_env(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        if !EMAIL_KEYS.iter().any(|k| env.optional(k).is_some()) {
            return Ok(None);
        }
        if let Some(missing) = EMAIL_KEYS.iter().find(|k| env.optional(k).is_none()) {
            return Err(ConfigError::MissingEnvVar(format!(
                "{missing} (email relay is partially configured)"
            )));
        }

        Ok(Some(Self {
            service_id: env.required("EMAIL_SERVICE_ID")?,
            template_id: env.required("EMAIL_TEMPLATE_ID")?,
            public_key: env.required("EMAIL_PUBLIC_KEY")?,
            from_address: env.required("EMAIL_FROM_ADDRESS")?,
            from_name: env.required("EMAIL_FROM_NAME")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Environment accessor over a lookup function.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get a required variable; blank values count as missing.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
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
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a key is not a placeholder and has sufficient entropy.
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
                "entropy too low ({entropy:.2} bits/char, need >= \
                 {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the project settings."
            ),
        ));
    }

    Ok(())
}

fn validated_secret(key: &str, value: String) -> Result<SecretString, ConfigError> {
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Expose a secret for an outgoing header.
pub(crate) fn expose(secret: &SecretString) -> &str {
    secret.expose_secret()
}
