//! Service configuration from `config.toml`

use std::path::Path;

use serde::Deserialize;

use crate::api::BackendConfig;
use crate::fleet::FleetConfig;
use crate::logging::{LogRotation, LoggingConfig, DEFAULT_LEVEL_FILTER};
use crate::postgres::PostgresConfig;

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "PROFILE_TRIAGE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for readiness checks
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_seconds: 5,
        }
    }
}

/// Logging section as written in the file
#[derive(Debug, Clone, Default, Deserialize)]
struct LoggingTomlConfig {
    pub log_dir: Option<String>,
    pub level_filter: Option<String>,
    pub rotation: Option<String>, // "daily" or "hourly"
    pub console_timestamps: Option<bool>,
    pub file_json_format: Option<bool>,
    pub cleanup_days: Option<u32>,
}

/// Full TOML configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TomlConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub fleet: FleetConfig,
    pub database: PostgresConfig,
    pub logging: Option<LoggingTomlConfig>,
}

/// Runtime configuration (converted from TOML)
#[derive(Debug, Clone, Default)]
pub struct TriageConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub fleet: FleetConfig,
    pub postgres: PostgresConfig,
    pub logging: LoggingConfig,
}

impl TriageConfig {
    /// Load configuration from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let toml_config: TomlConfig = toml::from_str(content)?;
        Ok(Self::from_toml_config(toml_config))
    }

    /// Path from `PROFILE_TRIAGE_CONFIG`, else `config.toml`
    pub fn default_path() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    fn from_toml_config(toml_config: TomlConfig) -> Self {
        let logging = match toml_config.logging {
            Some(log) => {
                let defaults = LoggingConfig::default();
                LoggingConfig {
                    log_dir: log.log_dir.unwrap_or(defaults.log_dir),
                    level_filter: log.level_filter.unwrap_or_else(|| DEFAULT_LEVEL_FILTER.to_string()),
                    rotation: log.rotation.as_deref().map(LogRotation::parse).unwrap_or(defaults.rotation),
                    console_timestamps: log.console_timestamps.unwrap_or(defaults.console_timestamps),
                    file_json_format: log.file_json_format.unwrap_or(defaults.file_json_format),
                    retention_days: log.cleanup_days.unwrap_or(defaults.retention_days),
                }
            }
            None => LoggingConfig::default(),
        };

        let mut fleet = toml_config.fleet;
        fleet.max_concurrency = fleet.max_concurrency.max(1);

        Self {
            server: toml_config.server,
            backend: toml_config.backend,
            fleet,
            postgres: toml_config.database,
            logging,
        }
    }
}
