//! Typed configuration from environment variables or a TOML file.
//!
//! Loads once at startup, fails fast if required values are missing.
//! The database URL is wrapped in secrecy::SecretString to keep it out of logs.

pub mod secrets;

use crate::error::{Error, Result};
use crate::lease::LeaseConfig;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_LEASE_TTL_SECS: u64 = 3600;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub listen_addr: String,
    pub lease_ttl_secs: u64,
    pub poll_interval_ms: u64,
    /// Upper bound on pooled post-store connections, shared by all sessions.
    pub db_max_connections: u32,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

/// On-disk shape of the TOML config file.
#[derive(Deserialize)]
struct FileConfig {
    database_url: String,
    #[serde(default = "default_listen_addr")]
    listen_addr: String,
    #[serde(default = "default_lease_ttl_secs")]
    lease_ttl_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
    #[serde(default = "default_db_max_connections")]
    db_max_connections: u32,
    #[serde(default)]
    otel_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| default_listen_addr()),
            lease_ttl_secs: numeric_var("LEASE_TTL_SECS", DEFAULT_LEASE_TTL_SECS)?,
            poll_interval_ms: numeric_var("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?,
            db_max_connections: numeric_var(
                "DB_MAX_CONNECTIONS",
                DEFAULT_DB_MAX_CONNECTIONS,
            )?,
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("bad config file {}: {e}", path.display())))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        let config = Self {
            database_url: SecretString::from(file.database_url),
            listen_addr: file.listen_addr,
            lease_ttl_secs: file.lease_ttl_secs,
            poll_interval_ms: file.poll_interval_ms,
            db_max_connections: file.db_max_connections,
            otel_endpoint: file.otel_endpoint,
            log_level: file.log_level,
        };
        config.validate()?;
        Ok(config)
    }

    /// Lease timing handed to every worker session.
    pub fn lease(&self) -> LeaseConfig {
        LeaseConfig {
            ttl: Duration::from_secs(self.lease_ttl_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.lease_ttl_secs == 0 {
            return Err(Error::Config("lease TTL must be at least one second".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll interval must be non-zero".to_string()));
        }
        if self.db_max_connections == 0 {
            return Err(Error::Config("database pool needs at least one connection".to_string()));
        }
        Ok(())
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn numeric_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{name} must be an unsigned integer, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_lease_ttl_secs() -> u64 {
    DEFAULT_LEASE_TTL_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_db_max_connections() -> u32 {
    DEFAULT_DB_MAX_CONNECTIONS
}

fn default_log_level() -> String {
    "info".to_string()
}
