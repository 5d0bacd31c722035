//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::{Config, ServerConfig, MAX_LEADERBOARD_ROWS};

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config, server: &ServerConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    let nickname = &config.bot.nickname;
    if nickname.is_empty() {
        errors.push("bot.nickname is required".to_string());
    }
    if nickname.chars().any(|c| c.is_whitespace() || matches!(c, '!' | '@' | '#' | ':' | ',')) {
        errors.push(format!("bot.nickname '{}' contains invalid characters", nickname));
    }

    if config.leaderboard.enabled {
        match config.leaderboard.database_url.as_deref() {
            None | Some("") => {
                errors.push("leaderboard.database_url is required when the leaderboard is enabled".to_string());
            }
            Some(url) if !url.starts_with("mysql://") => {
                errors.push(format!("leaderboard.database_url '{}' must be a mysql:// URL", url));
            }
            Some(_) => {}
        }
        if !(1..=MAX_LEADERBOARD_ROWS).contains(&config.leaderboard.limit) {
            errors.push(format!(
                "leaderboard.limit must be between 1 and {} (got {})",
                MAX_LEADERBOARD_ROWS, config.leaderboard.limit
            ));
        }
    }

    if config.links.timeout_secs == 0 {
        errors.push("links.timeout_secs must be non-zero".to_string());
    }
    if config.ping.timeout_secs == 0 {
        errors.push("ping.timeout_secs must be non-zero".to_string());
    }

    if server.host.is_empty() {
        errors.push("server host is required".to_string());
    }
    if server.port == 0 {
        errors.push("server port must be non-zero".to_string());
    }
    if server.channel.len() < 2 || server.channel.contains(' ') || server.channel.contains(',') {
        errors.push(format!("'{}' is not a valid channel name", server.channel));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
