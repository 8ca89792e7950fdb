//! Client configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub app: AppSettings,
    pub gateway: GatewayConfig,
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub identity: IdentityConfig,
    /// Token used to seed the credential store
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Gateway connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub url: String,
    /// Bound on opening the transport and on waiting for hello
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// Fraction of the delay added or removed at random (0.0 - 1.0)
    #[serde(default = "default_backoff_jitter")]
    pub backoff_jitter: f64,
    #[serde(default = "default_invalid_session_delay_min_ms")]
    pub invalid_session_delay_min_ms: u64,
    #[serde(default = "default_invalid_session_delay_max_ms")]
    pub invalid_session_delay_max_ms: u64,
    /// Consecutive malformed frames tolerated before the connection is recycled
    #[serde(default = "default_max_protocol_errors")]
    pub max_protocol_errors: u32,
    /// Accepted for compatibility; the missed-ack tolerance is fixed
    #[serde(default)]
    pub legacy_max_missed_acks: Option<u32>,
}

impl GatewayConfig {
    /// Gateway settings with every tunable at its default
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout_ms: default_connect_timeout_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            backoff_jitter: default_backoff_jitter(),
            invalid_session_delay_min_ms: default_invalid_session_delay_min_ms(),
            invalid_session_delay_max_ms: default_invalid_session_delay_max_ms(),
            max_protocol_errors: default_max_protocol_errors(),
            legacy_max_missed_acks: None,
        }
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// HTTP API settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_api_timeout_secs(),
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Local state cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Recent messages kept per channel
    #[serde(default = "default_message_limit")]
    pub message_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            message_limit: default_message_limit(),
        }
    }
}

/// Client properties announced in identify
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_os")]
    pub os: String,
    #[serde(default = "default_browser")]
    pub browser: String,
    #[serde(default = "default_device")]
    pub device: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            os: default_os(),
            browser: default_browser(),
            device: default_device(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "guildlink".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

fn default_backoff_jitter() -> f64 {
    0.3
}

fn default_invalid_session_delay_min_ms() -> u64 {
    1_000
}

fn default_invalid_session_delay_max_ms() -> u64 {
    5_000
}

fn default_max_protocol_errors() -> u32 {
    5
}

fn default_api_timeout_secs() -> u64 {
    10
}

fn default_message_limit() -> usize {
    50
}

fn default_os() -> String {
    env::consts::OS.to_string()
}

fn default_browser() -> String {
    "guildlink".to_string()
}

fn default_device() -> String {
    "guildlink".to_string()
}

impl ClientConfig {
    /// Configuration with the two required endpoints and defaults elsewhere
    #[must_use]
    pub fn new(gateway_url: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: Environment::default(),
            },
            gateway: GatewayConfig::new(gateway_url),
            api: ApiConfig::new(api_base_url),
            cache: CacheConfig::default(),
            identity: IdentityConfig::default(),
            auth_token: None,
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &'static str,
        ) -> Result<Option<T>, ConfigError> {
            lookup(key)
                .map(|raw| {
                    raw.trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue(key, raw.clone()))
                })
                .transpose()
        }

        let config = Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            gateway: GatewayConfig {
                url: lookup("GATEWAY_URL").ok_or(ConfigError::MissingVar("GATEWAY_URL"))?,
                connect_timeout_ms: parsed(&lookup, "GATEWAY_CONNECT_TIMEOUT_MS")?
                    .unwrap_or_else(default_connect_timeout_ms),
                backoff_base_ms: parsed(&lookup, "GATEWAY_BACKOFF_BASE_MS")?
                    .unwrap_or_else(default_backoff_base_ms),
                backoff_max_ms: parsed(&lookup, "GATEWAY_BACKOFF_MAX_MS")?
                    .unwrap_or_else(default_backoff_max_ms),
                backoff_jitter: parsed(&lookup, "GATEWAY_BACKOFF_JITTER")?
                    .unwrap_or_else(default_backoff_jitter),
                invalid_session_delay_min_ms: parsed(&lookup, "GATEWAY_INVALID_SESSION_DELAY_MIN_MS")?
                    .unwrap_or_else(default_invalid_session_delay_min_ms),
                invalid_session_delay_max_ms: parsed(&lookup, "GATEWAY_INVALID_SESSION_DELAY_MAX_MS")?
                    .unwrap_or_else(default_invalid_session_delay_max_ms),
                max_protocol_errors: parsed(&lookup, "GATEWAY_MAX_PROTOCOL_ERRORS")?
                    .unwrap_or_else(default_max_protocol_errors),
                legacy_max_missed_acks: parsed(&lookup, "GATEWAY_MAX_MISSED_ACKS")?,
            },
            api: ApiConfig {
                base_url: lookup("API_BASE_URL").ok_or(ConfigError::MissingVar("API_BASE_URL"))?,
                timeout_secs: parsed(&lookup, "API_TIMEOUT_SECS")?
                    .unwrap_or_else(default_api_timeout_secs),
            },
            cache: CacheConfig {
                message_limit: parsed(&lookup, "CACHE_MESSAGE_LIMIT")?
                    .unwrap_or_else(default_message_limit),
            },
            identity: IdentityConfig {
                os: lookup("CLIENT_OS").unwrap_or_else(default_os),
                browser: lookup("CLIENT_BROWSER").unwrap_or_else(default_browser),
                device: lookup("CLIENT_DEVICE").unwrap_or_else(default_device),
            },
            auth_token: lookup("AUTH_TOKEN").filter(|t| !t.trim().is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        let gateway = &self.gateway;
        if !(0.0..=1.0).contains(&gateway.backoff_jitter) {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_BACKOFF_JITTER",
                gateway.backoff_jitter.to_string(),
            ));
        }
        if gateway.backoff_base_ms == 0 || gateway.backoff_base_ms > gateway.backoff_max_ms {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_BACKOFF_BASE_MS",
                gateway.backoff_base_ms.to_string(),
            ));
        }
        if gateway.invalid_session_delay_min_ms > gateway.invalid_session_delay_max_ms {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_INVALID_SESSION_DELAY_MIN_MS",
                gateway.invalid_session_delay_min_ms.to_string(),
            ));
        }
        if self.cache.message_limit == 0 {
            return Err(ConfigError::InvalidValue("CACHE_MESSAGE_LIMIT", "0".to_string()));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
