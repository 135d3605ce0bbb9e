//! Configuration management for the Kedai inventory back-office
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with KEDAI_ prefix

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use uuid::Uuid;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Stock engine limits and timeouts
    pub stock: StockConfig,

    /// Owner resolution for staff and shared catalogs
    #[serde(default)]
    pub tenancy: TenancyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StockConfig {
    /// Timeout for a single stock adjustment unit of work, in seconds
    pub default_timeout_secs: u64,

    /// Timeout for the CSV batch import unit of work, in seconds
    pub csv_timeout_secs: u64,

    /// Largest accepted CSV upload in bytes
    pub csv_max_bytes: usize,
}

impl StockConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn csv_timeout(&self) -> Duration {
        Duration::from_secs(self.csv_timeout_secs)
    }
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 5,
            csv_timeout_secs: 20,
            csv_max_bytes: 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TenancyConfig {
    /// Owner whose catalog staff accounts without an employer write against,
    /// and whose products every owner may read as a shared catalog
    pub designated_owner_id: Option<Uuid>,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("KEDAI_ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let stock = StockConfig::default();

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 28800)?
            .set_default("stock.default_timeout_secs", stock.default_timeout_secs)?
            .set_default("stock.csv_timeout_secs", stock.csv_timeout_secs)?
            .set_default("stock.csv_max_bytes", stock.csv_max_bytes as u64)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (KEDAI_ prefix)
            .add_source(
                Environment::with_prefix("KEDAI")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
