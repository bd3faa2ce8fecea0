use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::info;

const CONFIG_DIR: &str = "config";
const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Application configuration, layered from built-in defaults, optional
/// `config/{default,<env>}.toml` files, and `APP__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub environment: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Run migrations on startup.
    #[serde(default)]
    pub auto_migrate: bool,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    /// Processing fee applied to every order, as a fraction of the subtotal.
    #[serde(default = "default_processing_fee_rate")]
    pub processing_fee_rate: f64,

    /// Base URL of the upstream product catalog API.
    #[serde(default = "default_catalog_base_url")]
    pub catalog_base_url: String,
    /// Page size used when walking the catalog API.
    #[serde(default = "default_catalog_page_size")]
    pub catalog_page_size: u64,
    /// Maximum records written per mirror batch.
    #[serde(default = "default_catalog_batch_size")]
    pub catalog_batch_size: usize,
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

fn default_processing_fee_rate() -> f64 {
    0.03
}

fn default_catalog_base_url() -> String {
    "http://localhost:9000/api".to_string()
}

fn default_catalog_page_size() -> u64 {
    50
}

fn default_catalog_batch_size() -> usize {
    400
}

impl AppConfig {
    /// Minimal constructor used by tests and embedding callers.
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            processing_fee_rate: default_processing_fee_rate(),
            catalog_base_url: default_catalog_base_url(),
            catalog_page_size: default_catalog_page_size(),
            catalog_batch_size: default_catalog_batch_size(),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Load configuration for the current environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
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
        .set_default("database_url", "sqlite://domainstore.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8080)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    config.try_deserialize()
}

/// Initialise the global tracing subscriber.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("domainstore_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(filter_directive))
        .with(fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_ambient_settings() {
        let cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "test".into(),
        );
        assert_eq!(cfg.processing_fee_rate, 0.03);
        assert_eq!(cfg.catalog_batch_size, 400);
        assert!(!cfg.auto_migrate);
        assert_eq!(cfg.server_addr(), "127.0.0.1:8080");
    }
}
