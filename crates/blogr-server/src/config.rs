//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Secret used when none is configured. Fine for local development only.
pub const DEV_SECRET_KEY: &str = "dev";

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Session cookie settings.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file. Its parent directory is created on
    /// startup if missing.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum pooled connections (one per in-flight request).
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "blogr_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Session cookie configuration.
#[derive(Clone, Deserialize)]
pub struct SessionConfig {
    /// Secret the session signing key is derived from.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Session lifetime in seconds.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,

    /// Mark the cookie `Secure` (HTTPS only).
    #[serde(default)]
    pub secure_cookie: bool,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret_key", &"<redacted>")
            .field("cookie_name", &self.cookie_name)
            .field("max_age_secs", &self.max_age_secs)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "instance/blogr.sqlite".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_secret_key() -> String {
    DEV_SECRET_KEY.to_string()
}

fn default_cookie_name() -> String {
    "session".to_string()
}

fn default_max_age_secs() -> u64 {
    7 * 24 * 60 * 60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            cookie_name: default_cookie_name(),
            max_age_secs: default_max_age_secs(),
            secure_cookie: false,
        }
    }
}

impl DatabaseConfig {
    /// Pool settings for `blogr_db::create_pool`.
    pub fn runtime_settings(&self) -> blogr_db::DbRuntimeSettings {
        blogr_db::DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but cannot be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `BLOGR_HOST` overrides `server.host`
/// - `BLOGR_PORT` overrides `server.port`
/// - `BLOGR_DB_PATH` overrides `database.path`
/// - `BLOGR_LOG_LEVEL` overrides `logging.level`
/// - `BLOGR_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `BLOGR_SECRET_KEY` overrides `session.secret_key`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if the resulting configuration is unusable.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Ok(host) = std::env::var("BLOGR_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("BLOGR_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("BLOGR_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("BLOGR_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("BLOGR_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(secret) = std::env::var("BLOGR_SECRET_KEY") {
        config.session.secret_key = secret;
    }

    config.validate()?;
    Ok(config)
}

impl Config {
    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.secret_key.is_empty() {
            return Err(ConfigError::Invalid(
                "session.secret_key must not be empty".to_string(),
            ));
        }
        if self.session.cookie_name.is_empty() {
            return Err(ConfigError::Invalid(
                "session.cookie_name must not be empty".to_string(),
            ));
        }
        if self.session.max_age_secs == 0 {
            return Err(ConfigError::Invalid(
                "session.max_age_secs must be positive".to_string(),
            ));
        }
        if self.database.pool_max_size == 0 {
            return Err(ConfigError::Invalid(
                "database.pool_max_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the built-in development secret is still in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.session.secret_key == DEV_SECRET_KEY
    }
}
