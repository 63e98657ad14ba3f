//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "INFERENCE_GATEWAY_CONFIG";

/// Prefix for environment overrides, e.g. `INFERENCE_GATEWAY__SERVER__PORT`
const ENV_PREFIX: &str = "INFERENCE_GATEWAY";

const DEFAULT_CONFIG_PATH: &str = "config/gateway";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub health_check: HealthCheckConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default, alias = "servers")]
    pub backends: Vec<BackendConfig>,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    11435
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Background health polling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthCheckConfig {
    #[serde(default = "default_health_check_path")]
    pub path: String,
    #[serde(default = "default_health_check_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_health_timeout")]
    pub timeout_secs: u64,
}

fn default_health_check_path() -> String {
    "/api/tags".to_string()
}

fn default_health_check_interval() -> u64 {
    10
}

fn default_health_timeout() -> u64 {
    5
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            path: default_health_check_path(),
            interval_secs: default_health_check_interval(),
            timeout_secs: default_health_timeout(),
        }
    }
}

/// Outbound request timeouts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Upper bound for a whole single-backend exchange, streamed body included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Per-backend bound for aggregated sub-calls
    #[serde(default = "default_aggregation_timeout")]
    pub aggregation_timeout_secs: u64,
    /// Largest model-bearing body read into memory for routing
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_request_timeout() -> u64 {
    600
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_aggregation_timeout() -> u64 {
    5
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            aggregation_timeout_secs: default_aggregation_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// One configured inference server.
///
/// Lower `priority` values are preferred during selection.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BackendConfig {
    pub address: String,
    #[serde(default)]
    pub priority: i64,
}

impl BackendConfig {
    pub fn new(address: impl Into<String>, priority: i64) -> Self {
        Self {
            address: address.into(),
            priority,
        }
    }
}

impl Settings {
    /// Load settings from the file named by `INFERENCE_GATEWAY_CONFIG`
    /// (or `config/gateway.*`) plus environment overrides
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::build(File::with_name(&path).required(false))
    }

    /// Load settings from a specific configuration file.
    ///
    /// The format (JSON, YAML, TOML) follows the file extension.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AppError::Config(config::ConfigError::Message(format!(
                "Configuration file not found: {}",
                path.display()
            ))));
        }

        Self::build(File::from(path))
    }

    fn build<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .add_source(source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(config_error("Server port cannot be 0"));
        }

        if self.health_check.interval_secs == 0 || self.health_check.timeout_secs == 0 {
            return Err(config_error("Health check interval and timeout must be positive"));
        }

        if self.proxy.request_timeout_secs == 0
            || self.proxy.connect_timeout_secs == 0
            || self.proxy.aggregation_timeout_secs == 0
        {
            return Err(config_error("Proxy timeouts must be positive"));
        }

        if self.proxy.max_body_bytes == 0 {
            return Err(config_error("Proxy body limit must be positive"));
        }

        if self.backends.is_empty() {
            return Err(config_error("At least one backend must be configured"));
        }

        let mut seen = HashSet::new();
        for backend in &self.backends {
            let url = Url::parse(&backend.address).map_err(|e| {
                config_error(format!("Backend address '{}' is invalid: {}", backend.address, e))
            })?;

            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(config_error(format!(
                    "Backend address '{}' must use http or https",
                    backend.address
                )));
            }

            if !seen.insert(backend.address.trim_end_matches('/')) {
                return Err(config_error(format!(
                    "Backend address '{}' is configured more than once",
                    backend.address
                )));
            }
        }

        Ok(())
    }

    /// Socket address the listener binds to
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn config_error(msg: impl Into<String>) -> AppError {
    AppError::Config(config::ConfigError::Message(msg.into()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            health_check: HealthCheckConfig::default(),
            proxy: ProxyConfig::default(),
            backends: vec![],
        }
    }
}
