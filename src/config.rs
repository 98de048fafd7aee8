use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use validator::{Validate, ValidationError};

/// Application configuration, loaded from an optional `config/default.toml`
/// plus `MARKETPLACE__*` environment overrides.
///
/// The tax rate and default shipping country are deliberately configuration
/// inputs rather than constants baked into the checkout code.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL (postgres or sqlite)
    pub database_url: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_environment")]
    pub environment: String,

    /// Flat tax rate applied to order subtotals (0.18 = 18% GST)
    #[serde(default = "default_tax_rate")]
    #[validate(custom = "validate_tax_rate")]
    pub tax_rate: Decimal,

    /// Country assumed when a shipping query does not name one
    #[serde(default = "default_country")]
    pub default_country: String,

    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Create missing tables from entity definitions on startup
    #[serde(default)]
    pub auto_migrate: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,
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

fn default_tax_rate() -> Decimal {
    dec!(0.18)
}

fn default_country() -> String {
    "IN".to_string()
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn validate_tax_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if *rate < Decimal::ZERO || *rate > Decimal::ONE {
        let mut err = ValidationError::new("tax_rate");
        err.message = Some("tax_rate must be between 0.0 and 1.0".into());
        return Err(err);
    }
    Ok(())
}

impl AppConfig {
    /// Minimal constructor used by tests and tools.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: default_host(),
            port: default_port(),
            environment: "test".to_string(),
            tax_rate: default_tax_rate(),
            default_country: default_country(),
            event_channel_capacity: default_event_channel_capacity(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            auto_migrate: false,
            log_level: default_log_level(),
            log_json: false,
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// Loads and validates configuration from files and environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let cfg: AppConfig = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::with_prefix("MARKETPLACE").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;

    Ok(cfg)
}

/// Installs the global tracing subscriber.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}
