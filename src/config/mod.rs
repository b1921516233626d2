//! Configuration loading and management.

mod defaults;
mod validation;

use caradhina::ConnectionConfig;
use defaults::*;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server to connect to.
    pub server: ServerConfig,
    /// Bot identity and behaviour.
    pub bot: BotConfig,
    /// Read loop and registration tuning.
    #[serde(default)]
    pub connection: ConnectionSettings,
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server address.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Hostname (e.g., "irc.choopa.net").
    pub host: String,
    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Bot identity and behaviour switches.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Nickname, also sent as user name and real name.
    pub nick: String,
    /// Nick allowed to stop the bot from anywhere.
    #[serde(default)]
    pub admin: Option<String>,
    /// Channels joined once registration settles.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Message that makes the bot quit.
    #[serde(default = "default_stop_command")]
    pub stop_command: String,
    /// Quit on the first PRIVMSG received.
    #[serde(default)]
    pub shy: bool,
}

/// Read loop and registration tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_registration_delay_ms")]
    pub registration_delay_ms: u64,
    #[serde(default = "default_registration_timeout_secs")]
    pub registration_timeout_secs: u64,
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    #[serde(default = "default_quit_message")]
    pub quit_message: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            registration_delay_ms: default_registration_delay_ms(),
            registration_timeout_secs: default_registration_timeout_secs(),
            read_buffer_size: default_read_buffer_size(),
            quit_message: default_quit_message(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. "info,caradhina=debug".
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Settings handed to the connection.
    pub fn connection_config(&self) -> ConnectionConfig {
        let settings = &self.connection;
        ConnectionConfig {
            nick: self.bot.nick.clone(),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            registration_delay: Duration::from_millis(settings.registration_delay_ms),
            registration_timeout: Duration::from_secs(settings.registration_timeout_secs),
            read_buffer_size: settings.read_buffer_size,
            quit_message: settings.quit_message.clone(),
        }
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        validation::validate(&config).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            ConfigError::Invalid(messages.join("; "))
        })?;
        Ok(config)
    }
}
