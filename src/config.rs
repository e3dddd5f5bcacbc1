use config::{Config, Environment, File};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use validator::Validate;

/// Application configuration, loaded from `config/default.toml` (optional),
/// an environment-specific file, and `APP__*` environment variables.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment (development, test, production)
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

    /// Shared secret for verifying bearer tokens minted by the external
    /// identity provider
    #[validate(length(min = 32))]
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Default currency for carts and orders
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Flat shipping surcharge for the single supported region
    #[serde(default = "default_shipping_surcharge")]
    pub shipping_surcharge: f64,

    /// Card payment provider (hosted checkout) settings
    #[serde(default = "default_card_api_base")]
    pub card_api_base: String,
    #[serde(default)]
    pub card_secret_key: String,
    #[serde(default = "default_card_success_url")]
    pub card_success_url: String,
    #[serde(default = "default_card_cancel_url")]
    pub card_cancel_url: String,
    /// Shared secret for inbound webhook signature verification
    #[serde(default)]
    pub card_webhook_secret: Option<String>,
    /// Webhook timestamp tolerance in seconds
    #[serde(default = "default_webhook_tolerance_secs")]
    pub card_webhook_tolerance_secs: u64,

    /// Wallet payment provider (order/capture API) settings
    #[serde(default = "default_wallet_api_base")]
    pub wallet_api_base: String,
    #[serde(default)]
    pub wallet_client_id: String,
    #[serde(default)]
    pub wallet_client_secret: String,

    /// SMTP settings for customer notifications; email is disabled when the
    /// host is absent
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default)]
    pub email_from: Option<String>,
}

fn default_database_url() -> String {
    "sqlite://storefront.db?mode=rwc".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_environment() -> String {
    "development".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
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
fn default_jwt_secret() -> String {
    "insecure_development_secret_change_me_in_prod".to_string()
}
fn default_currency() -> String {
    "USD".to_string()
}
fn default_shipping_surcharge() -> f64 {
    100.0
}
fn default_card_api_base() -> String {
    "https://api.stripe.com".to_string()
}
fn default_card_success_url() -> String {
    "http://localhost:3000/checkout/success".to_string()
}
fn default_card_cancel_url() -> String {
    "http://localhost:3000/checkout/cancel".to_string()
}
fn default_webhook_tolerance_secs() -> u64 {
    300
}
fn default_wallet_api_base() -> String {
    "https://api-m.sandbox.paypal.com".to_string()
}
fn default_smtp_port() -> u16 {
    587
}

impl AppConfig {
    /// Minimal constructor used by tests and tools.
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: default_host(),
            port: default_port(),
            environment: "test".to_string(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            jwt_secret: jwt_secret.into(),
            currency: default_currency(),
            shipping_surcharge: default_shipping_surcharge(),
            card_api_base: default_card_api_base(),
            card_secret_key: String::new(),
            card_success_url: default_card_success_url(),
            card_cancel_url: default_card_cancel_url(),
            card_webhook_secret: None,
            card_webhook_tolerance_secs: default_webhook_tolerance_secs(),
            wallet_api_base: default_wallet_api_base(),
            wallet_client_id: String::new(),
            wallet_client_secret: String::new(),
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            email_from: None,
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Shipping surcharge as an exact decimal amount.
    pub fn shipping_surcharge(&self) -> Decimal {
        Decimal::from_f64(self.shipping_surcharge).unwrap_or(Decimal::ZERO)
    }

    /// True when SMTP is configured well enough to send mail.
    pub fn email_enabled(&self) -> bool {
        self.smtp_host.is_some() && self.email_from.is_some()
    }
}

/// Load configuration from files and environment.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    let cfg = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{}", environment)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = cfg.try_deserialize()?;
    Ok(app_config)
}

/// Initialize the global tracing subscriber.
pub fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::new("sqlite::memory:", "x".repeat(32));
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.currency, "USD");
        assert!(!cfg.email_enabled());
    }

    #[test]
    fn shipping_surcharge_is_exact() {
        let cfg = AppConfig::new("sqlite::memory:", "x".repeat(32));
        assert_eq!(cfg.shipping_surcharge(), dec!(100));
    }

    #[test]
    fn email_enabled_requires_host_and_from() {
        let mut cfg = AppConfig::new("sqlite::memory:", "x".repeat(32));
        cfg.smtp_host = Some("smtp.example.com".to_string());
        assert!(!cfg.email_enabled());
        cfg.email_from = Some("shop@example.com".to_string());
        assert!(cfg.email_enabled());
    }
}
