//! Configuration module for rssbot.

use serde::Deserialize;
use std::path::Path;

use crate::{BotError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/rssbot.db".to_string()
}

fn default_db_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_db_max_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/rssbot.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Feed refresh and fetch configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RssConfig {
    /// Items younger than this and not yet recorded are announced.
    #[serde(default = "default_freshness_window")]
    pub freshness_window_secs: u64,
    /// Items younger than this and already recorded have their record dropped.
    #[serde(default = "default_retention_window")]
    pub retention_window_secs: u64,
    /// Connection timeout in seconds.
    #[serde(default = "default_rss_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_rss_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_rss_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_rss_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_rss_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// User agent sent with feed requests.
    #[serde(default = "default_rss_user_agent")]
    pub user_agent: String,
    /// Allow feeds on loopback, private and link-local hosts.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

fn default_freshness_window() -> u64 {
    24 * 60 * 60 // 24 hours
}

fn default_retention_window() -> u64 {
    10 * 24 * 60 * 60 // 10 days
}

fn default_rss_connect_timeout() -> u64 {
    10
}

fn default_rss_read_timeout() -> u64 {
    20
}

fn default_rss_total_timeout() -> u64 {
    30
}

fn default_rss_max_redirects() -> usize {
    5
}

fn default_rss_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_rss_user_agent() -> String {
    concat!("rssbot/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            freshness_window_secs: default_freshness_window(),
            retention_window_secs: default_retention_window(),
            connect_timeout_secs: default_rss_connect_timeout(),
            read_timeout_secs: default_rss_read_timeout(),
            total_timeout_secs: default_rss_total_timeout(),
            max_redirects: default_rss_max_redirects(),
            max_feed_size_bytes: default_rss_max_feed_size(),
            user_agent: default_rss_user_agent(),
            allow_private_hosts: false,
        }
    }
}

/// Command handling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Token that addresses a message to the bot (e.g. `!rss refresh`).
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Maximum number of commands processed at the same time.
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,
    /// Seconds to wait for in-flight commands on shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_command_prefix() -> String {
    "!rss".to_string()
}

fn default_max_concurrent_tasks() -> usize {
    8
}

fn default_shutdown_grace() -> u64 {
    5
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Feed configuration.
    #[serde(default)]
    pub rss: RssConfig,
    /// Command handling configuration.
    #[serde(default)]
    pub bot: BotConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(BotError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| BotError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `RSSBOT_DATABASE_PATH`: Override the database file path
    /// - `RSSBOT_LOG_LEVEL`: Override the log level
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("RSSBOT_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(level) = std::env::var("RSSBOT_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.rss.freshness_window_secs == 0 || self.rss.retention_window_secs == 0 {
            return Err(BotError::Config(
                "freshness and retention windows must be non-zero".to_string(),
            ));
        }
        if self.bot.max_concurrent_tasks == 0 {
            return Err(BotError::Config(
                "max_concurrent_tasks must be at least 1".to_string(),
            ));
        }
        let prefix = &self.bot.command_prefix;
        if prefix.is_empty() || prefix.contains(char::is_whitespace) {
            return Err(BotError::Config(
                "command_prefix must be a single non-empty token".to_string(),
            ));
        }
        Ok(())
    }
}
