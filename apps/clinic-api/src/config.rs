//! Service configuration
//!
//! Read from `CLINIC_*` environment variables; anything unset keeps its
//! default.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clinic_core::BillingPolicy;
use clinic_db::DbConfig;
use rust_decimal::Decimal;

pub const ENV_BIND_ADDR: &str = "CLINIC_BIND_ADDR";
pub const ENV_DB_PATH: &str = "CLINIC_DB_PATH";
pub const ENV_DB_MAX_CONNECTIONS: &str = "CLINIC_DB_MAX_CONNECTIONS";
pub const ENV_TAX_RATE: &str = "CLINIC_TAX_RATE";
pub const ENV_MAX_CONCURRENCY: &str = "CLINIC_MAX_CONCURRENCY";
pub const ENV_LOG_FORMAT: &str = "CLINIC_LOG_FORMAT";
pub const ENV_NAME: &str = "CLINIC_NAME";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub db: DbConfig,
    pub billing: BillingPolicy,
    /// Requests handled at once; the rest wait
    pub max_concurrency: usize,
    pub log_format: LogFormat,
    /// Printed at the top of invoices and prescriptions
    pub clinic_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            db: DbConfig::default(),
            billing: BillingPolicy::default(),
            max_concurrency: 64,
            log_format: LogFormat::Pretty,
            clinic_name: "Dental Clinic".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            config.bind_addr = addr
                .parse()
                .with_context(|| format!("{} is not a socket address: {}", ENV_BIND_ADDR, addr))?;
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            config.db.db_path = path;
        }
        if let Some(max) = lookup(ENV_DB_MAX_CONNECTIONS) {
            config.db.max_connections = max
                .parse()
                .with_context(|| format!("{} must be a number: {}", ENV_DB_MAX_CONNECTIONS, max))?;
        }
        if let Some(rate) = lookup(ENV_TAX_RATE) {
            let rate: Decimal = rate
                .parse()
                .with_context(|| format!("{} must be a decimal: {}", ENV_TAX_RATE, rate))?;
            anyhow::ensure!(
                rate >= Decimal::ZERO && rate < Decimal::ONE,
                "{} must be a fraction between 0 and 1, got {}",
                ENV_TAX_RATE,
                rate
            );
            config.billing.tax_rate = rate;
        }
        if let Some(limit) = lookup(ENV_MAX_CONCURRENCY) {
            config.max_concurrency = limit
                .parse()
                .with_context(|| format!("{} must be a number: {}", ENV_MAX_CONCURRENCY, limit))?;
            anyhow::ensure!(config.max_concurrency > 0, "{} must be positive", ENV_MAX_CONCURRENCY);
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            config.log_format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            };
        }
        if let Some(name) = lookup(ENV_NAME) {
            if !name.trim().is_empty() {
                config.clinic_name = name.trim().to_string();
            }
        }

        Ok(config)
    }
}
