use std::{io::IsTerminal, time::Duration};

use insc_indexer_db::PoolSettings;
use serde::{Deserialize, Serialize};

use crate::constants::database::{
    DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_DATABASE_URL, DEFAULT_IDLE_TIMEOUT_SECS,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_LIFETIME_SECS, DEFAULT_MIN_IDLE,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Log every compiled batch statement at `debug` level.
    #[serde(default)]
    pub enable_log: bool,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: Option<u64>,
    #[serde(default = "default_max_lifetime_secs")]
    pub max_lifetime_secs: Option<u64>,
    #[serde(default = "default_min_idle")]
    pub min_idle: Option<u32>,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_connection_timeout_secs() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT_SECS
}

fn default_idle_timeout_secs() -> Option<u64> {
    Some(DEFAULT_IDLE_TIMEOUT_SECS)
}

fn default_max_lifetime_secs() -> Option<u64> {
    Some(DEFAULT_MAX_LIFETIME_SECS)
}

fn default_min_idle() -> Option<u32> {
    Some(DEFAULT_MIN_IDLE)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            enable_log: false,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            idle_timeout_secs: default_idle_timeout_secs(),
            max_lifetime_secs: default_max_lifetime_secs(),
            min_idle: default_min_idle(),
        }
    }
}

impl DatabaseConfig {
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_size: self.max_connections,
            connection_timeout: Duration::from_secs(self.connection_timeout_secs),
            idle_timeout: self.idle_timeout_secs.map(Duration::from_secs),
            max_lifetime: self.max_lifetime_secs.map(Duration::from_secs),
            min_idle: self.min_idle,
        }
    }
}

/// Output format of the logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON when stdout is not a terminal, text otherwise
    #[default]
    Auto,
    /// Bunyan JSON lines
    Json,
    /// Human-readable text
    Text,
}

impl LogFormat {
    /// Resolve [`LogFormat::Auto`] against the current stdout.
    pub fn resolve(self) -> Self {
        match self {
            LogFormat::Auto if std::io::stdout().is_terminal() => LogFormat::Text,
            LogFormat::Auto => LogFormat::Json,
            other => other,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> std::io::Result<Self> {
        toml::from_str(contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
