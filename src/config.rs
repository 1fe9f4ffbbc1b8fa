//! Application configuration
//!
//! Loaded from a TOML file (`~/.config/court-booking/config.toml` by
//! default), then patched from the environment. Every key is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::application::{CatalogConfig, CheckoutConfig, LedgerConfig};
use crate::domain::CustomerDetails;
use crate::infrastructure::payment::snap::SANDBOX_BASE_URL;
use crate::infrastructure::{DatabaseConfig, SnapConfig};

/// Overrides the config file location
pub const CONFIG_PATH_ENV: &str = "COURTBOOK_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// `<config dir>/court-booking/config.toml`, or `$COURTBOOK_CONFIG` when set.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("court-booking")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub logging: LoggingSection,
    pub booking: BookingSection,
    pub payment: PaymentSection,
    pub catalog: CatalogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Seconds allowed for draining on shutdown
    pub shutdown_timeout: u64,
    /// Browser origins allowed by CORS; empty allows any
    pub cors_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout: 30,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite://./court-booking.db?mode=rwc".to_string(),
            max_connections: 10,
            connect_timeout_secs: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingSection {
    pub hold_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub operation_timeout_ms: u64,
}

impl Default for BookingSection {
    fn default() -> Self {
        Self {
            hold_ttl_secs: 900,
            sweep_interval_secs: 60,
            operation_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentSection {
    pub server_key: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Reject notifications without a valid `signature_key`
    pub verify_signature: bool,
    pub customer_name: String,
    pub customer_email: String,
    pub item_name: String,
}

impl Default for PaymentSection {
    fn default() -> Self {
        let checkout = CheckoutConfig::default();
        Self {
            server_key: String::new(),
            base_url: SANDBOX_BASE_URL.to_string(),
            request_timeout_secs: 10,
            verify_signature: false,
            customer_name: checkout.customer.name,
            customer_email: checkout.customer.email,
            item_name: checkout.item_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    /// Create the demo courts on an empty database
    pub seed_demo: bool,
    pub window_days: u32,
    pub open_hour: u32,
    pub close_hour: u32,
    pub default_price: i64,
    pub refresh_interval_secs: u64,
}

impl Default for CatalogSection {
    fn default() -> Self {
        let catalog = CatalogConfig::default();
        Self {
            seed_demo: true,
            window_days: catalog.window_days,
            open_hour: catalog.open_hour,
            close_hour: catalog.close_hour,
            default_price: catalog.default_price,
            refresh_interval_secs: 3600,
        }
    }
}

impl AppConfig {
    /// Read and parse `path`, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// `DATABASE_URL`, `PORT`, `MIDTRANS_SERVER_KEY`, `LOG_LEVEL`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("DATABASE_URL") {
            info!("Env override: DATABASE_URL");
            self.database.url = url;
        }
        if let Some(port) = get("PORT") {
            match port.parse() {
                Ok(port) => {
                    info!(port, "Env override: PORT");
                    self.server.port = port;
                }
                Err(_) => tracing::warn!(value = %port, "Ignoring non-numeric PORT"),
            }
        }
        if let Some(key) = get("MIDTRANS_SERVER_KEY") {
            info!("Env override: MIDTRANS_SERVER_KEY");
            self.payment.server_key = key;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Reject combinations the services cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.server.port == 0 {
            return invalid("server.port must be non-zero");
        }
        if self.database.max_connections == 0 {
            return invalid("database.max_connections must be at least 1");
        }
        if !matches!(self.logging.format.to_lowercase().as_str(), "pretty" | "json") {
            return invalid("logging.format must be 'pretty' or 'json'");
        }
        if self.booking.hold_ttl_secs == 0 {
            return invalid("booking.hold_ttl_secs must be at least 1");
        }
        if self.booking.operation_timeout_ms == 0 {
            return invalid("booking.operation_timeout_ms must be at least 1");
        }
        if self.catalog.open_hour >= self.catalog.close_hour || self.catalog.close_hour > 24 {
            return invalid("catalog hours must satisfy open_hour < close_hour <= 24");
        }
        if self.catalog.default_price < 0 {
            return invalid("catalog.default_price must not be negative");
        }
        if self.payment.verify_signature && self.payment.server_key.is_empty() {
            return invalid("payment.verify_signature needs payment.server_key");
        }
        Ok(())
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            connect_timeout: Duration::from_secs(self.database.connect_timeout_secs),
        }
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            hold_ttl: Duration::from_secs(self.booking.hold_ttl_secs),
            operation_timeout: Duration::from_millis(self.booking.operation_timeout_ms),
        }
    }

    pub fn checkout_config(&self) -> CheckoutConfig {
        CheckoutConfig {
            customer: CustomerDetails {
                name: self.payment.customer_name.clone(),
                email: self.payment.customer_email.clone(),
            },
            item_name: self.payment.item_name.clone(),
        }
    }

    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            window_days: self.catalog.window_days,
            open_hour: self.catalog.open_hour,
            close_hour: self.catalog.close_hour,
            default_price: self.catalog.default_price,
        }
    }

    pub fn snap_config(&self) -> SnapConfig {
        SnapConfig {
            server_key: self.payment.server_key.clone(),
            base_url: self.payment.base_url.clone(),
            request_timeout: Duration::from_secs(self.payment.request_timeout_secs),
        }
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
