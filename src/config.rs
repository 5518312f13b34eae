use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

const DEFAULT_RAZORPAY_API_URL: &str = "https://api.razorpay.com";
const DEFAULT_SHOPMOZO_API_URL: &str = "https://shipping-api.com/app/api/v1/push-order";
const DEFAULT_WHATSAPP_API_URL: &str = "https://bhashsms.com/api/sendmsg.php";

/// Application configuration with validation.
///
/// Secrets (Razorpay key pair, confirmation-token secret, Shopmozo keys,
/// WhatsApp gateway credentials) are supplied via `APP__*` environment
/// variables or config files; the Razorpay secret and the token secret are
/// mandatory and their absence is a startup error.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    // ========== Razorpay ==========
    /// Razorpay key id (public half of the API key pair)
    pub razorpay_key_id: String,

    /// Razorpay key secret; also the HMAC key for callback signatures
    pub razorpay_key_secret: String,

    /// Razorpay API base URL (overridable for tests)
    #[serde(default = "default_razorpay_api_url")]
    pub razorpay_api_url: String,

    // ========== Confirmation token ==========
    /// HS256 secret for the short-lived checkout confirmation token
    #[validate(length(min = 32), custom = "validate_token_secret")]
    pub token_secret: String,

    /// Confirmation token lifetime in minutes
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: u64,

    // ========== Shopmozo shipping ==========
    #[serde(default = "default_shopmozo_api_url")]
    pub shopmozo_api_url: String,

    #[serde(default)]
    pub shopmozo_private_key: Option<String>,

    #[serde(default)]
    pub shopmozo_public_key: Option<String>,

    /// Warehouse the carrier ships from
    #[serde(default = "default_shopmozo_warehouse_id")]
    pub shopmozo_warehouse_id: String,

    /// Outbound shipping call timeout (seconds)
    #[serde(default = "default_shipping_timeout_secs")]
    pub shipping_timeout_secs: u64,

    // ========== WhatsApp messaging ==========
    #[serde(default = "default_whatsapp_api_url")]
    pub whatsapp_api_url: String,

    #[serde(default)]
    pub whatsapp_user: Option<String>,

    #[serde(default)]
    pub whatsapp_pass: Option<String>,

    #[serde(default = "default_whatsapp_sender")]
    pub whatsapp_sender: String,

    /// Outbound messaging call timeout (seconds)
    #[serde(default = "default_messaging_timeout_secs")]
    pub messaging_timeout_secs: u64,
}

impl AppConfig {
    /// Minimal constructor used by tests and tooling; everything else takes
    /// the serde defaults.
    pub fn new(
        database_url: impl Into<String>,
        razorpay_key_id: impl Into<String>,
        razorpay_key_secret: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            razorpay_key_id: razorpay_key_id.into(),
            razorpay_key_secret: razorpay_key_secret.into(),
            razorpay_api_url: default_razorpay_api_url(),
            token_secret: token_secret.into(),
            token_ttl_minutes: default_token_ttl_minutes(),
            shopmozo_api_url: default_shopmozo_api_url(),
            shopmozo_private_key: None,
            shopmozo_public_key: None,
            shopmozo_warehouse_id: default_shopmozo_warehouse_id(),
            shipping_timeout_secs: default_shipping_timeout_secs(),
            whatsapp_api_url: default_whatsapp_api_url(),
            whatsapp_user: None,
            whatsapp_pass: None,
            whatsapp_sender: default_whatsapp_sender(),
            messaging_timeout_secs: default_messaging_timeout_secs(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_razorpay_api_url() -> String {
    DEFAULT_RAZORPAY_API_URL.to_string()
}
fn default_token_ttl_minutes() -> u64 {
    15
}
fn default_shopmozo_api_url() -> String {
    DEFAULT_SHOPMOZO_API_URL.to_string()
}
fn default_shopmozo_warehouse_id() -> String {
    "43190".to_string()
}
fn default_shipping_timeout_secs() -> u64 {
    10
}
fn default_whatsapp_api_url() -> String {
    DEFAULT_WHATSAPP_API_URL.to_string()
}
fn default_whatsapp_sender() -> String {
    "BUZWAP".to_string()
}
fn default_messaging_timeout_secs() -> u64 {
    5
}

fn validate_token_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 32 {
        let mut err = ValidationError::new("token_secret");
        err.message = Some("token secret must be at least 32 characters".into());
        return Err(err);
    }

    // Reject obvious placeholders
    let lower = trimmed.to_ascii_lowercase();
    let weak_fragments = ["changeme", "password", "default", "secret123"];
    if weak_fragments.iter().any(|pattern| lower.contains(pattern)) {
        let mut err = ValidationError::new("token_secret");
        err.message =
            Some("token secret appears to be weak; use a cryptographically random string".into());
        return Err(err);
    }

    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration.
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://storefront.db?mode=rwc")?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // The payment secret and the token secret have no defaults on purpose:
    // running without them would silently accept unverifiable callbacks.
    for required in ["razorpay_key_id", "razorpay_key_secret", "token_secret"] {
        if config.get_string(required).is_err() {
            error!(
                "{} is not configured. Set APP__{} with the value from your provider dashboard.",
                required,
                required.to_uppercase()
            );
            return Err(AppConfigError::Load(ConfigError::NotFound(format!(
                "{} is required but not configured",
                required
            ))));
        }
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:",
            "rzp_test_key",
            "rzp_test_secret",
            "an_adequately_long_random_token_signing_value",
        )
    }

    #[test]
    fn base_config_passes_validation() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn short_token_secret_is_rejected() {
        let mut cfg = base_config();
        cfg.token_secret = "too-short".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn weak_token_secret_is_rejected() {
        let mut cfg = base_config();
        cfg.token_secret = "changeme_changeme_changeme_changeme_changeme".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn adapter_timeouts_have_bounded_defaults() {
        let cfg = base_config();
        assert_eq!(cfg.shipping_timeout_secs, 10);
        assert_eq!(cfg.messaging_timeout_secs, 5);
        assert_eq!(cfg.token_ttl_minutes, 15);
    }
}
