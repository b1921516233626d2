//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Characters a channel name may start with.
const CHANNEL_PREFIXES: [char; 4] = ['#', '&', '+', '!'];

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server.host is required")]
    MissingHost,
    #[error("bot.nick is required")]
    MissingNick,
    #[error("bot.nick must not contain spaces, got '{0}'")]
    NickHasSpace(String),
    #[error("bot.channels entry must start with one of # & + !, got '{0}'")]
    InvalidChannel(String),
    #[error("connection.poll_interval_ms must be greater than zero")]
    ZeroPollInterval,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::MissingHost);
    }

    let nick = &config.bot.nick;
    if nick.is_empty() {
        errors.push(ValidationError::MissingNick);
    } else if nick.contains(char::is_whitespace) {
        errors.push(ValidationError::NickHasSpace(nick.clone()));
    }

    for channel in &config.bot.channels {
        if !channel.starts_with(CHANNEL_PREFIXES) || channel.contains(char::is_whitespace) {
            errors.push(ValidationError::InvalidChannel(channel.clone()));
        }
    }

    if config.connection.poll_interval_ms == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
