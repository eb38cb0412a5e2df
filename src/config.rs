//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Query engine (broker) connection
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Endpoint that accepts query payloads
    #[serde(default = "default_engine_url")]
    pub url: String,

    /// Readiness probe; derived from `url` when unset
    pub health_url: Option<String>,

    #[serde(default = "default_engine_timeout")]
    pub request_timeout_secs: u64,
}

fn default_engine_url() -> String {
    "http://localhost:8082/druid/v2/".to_string()
}

fn default_engine_timeout() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            health_url: None,
            request_timeout_secs: default_engine_timeout(),
        }
    }
}

impl EngineConfig {
    /// Health URL, falling back to `/status/health` on the engine's origin
    pub fn health_url(&self) -> String {
        if let Some(url) = &self.health_url {
            return url.clone();
        }

        let base = match self.url.find("/druid/") {
            Some(idx) => &self.url[..idx],
            None => self.url.trim_end_matches('/'),
        };
        format!("{}/status/health", base)
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
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
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("druid-panel").join("config.toml")),
            Some(PathBuf::from("/etc/druid-panel/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a key lookup (the process environment in practice)
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Engine overrides
        if let Some(url) = lookup("DRUID_PANEL_ENGINE_URL") {
            self.engine.url = url;
        }
        if let Some(timeout) = lookup("DRUID_PANEL_ENGINE_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                self.engine.request_timeout_secs = t;
            }
        }

        // API overrides
        if let Some(host) = lookup("DRUID_PANEL_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("DRUID_PANEL_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Logging overrides
        if let Some(level) = lookup("DRUID_PANEL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("DRUID_PANEL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# druid-panel configuration
#
# Environment variables override these settings:
# - DRUID_PANEL_ENGINE_URL
# - DRUID_PANEL_ENGINE_TIMEOUT_SECS
# - DRUID_PANEL_API_HOST
# - DRUID_PANEL_API_PORT
# - DRUID_PANEL_LOG_LEVEL
# - DRUID_PANEL_LOG_FORMAT

[engine]
# Broker endpoint that accepts query payloads
url = "http://localhost:8082/druid/v2/"

# Readiness probe (defaults to <engine origin>/status/health)
# health_url = "http://localhost:8082/status/health"

# Per-query timeout in seconds
request_timeout_secs = 30

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Allowed CORS origins
cors_origins = ["http://localhost:3000", "http://127.0.0.1:3000"]

# Request timeout in seconds
request_timeout_secs = 60

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
