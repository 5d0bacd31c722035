//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `SNURR_NICKNAME` - Bot nickname
//! - `SNURR_LEADERBOARD_ENABLED` - `true`/`false`
//! - `SNURR_LEADERBOARD_DATABASE_URL` - Scores database URL

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "SNURR";

/// Apply environment variable overrides to a config.
///
/// Keeps database credentials out of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(nickname) = env::var(format!("{}_NICKNAME", ENV_PREFIX)) {
        config.bot.nickname = nickname;
    }

    if let Ok(enabled) = env::var(format!("{}_LEADERBOARD_ENABLED", ENV_PREFIX)) {
        if let Ok(enabled) = enabled.parse() {
            config.leaderboard.enabled = enabled;
        }
    }
    if let Ok(url) = env::var(format!("{}_LEADERBOARD_DATABASE_URL", ENV_PREFIX)) {
        config.leaderboard.database_url = Some(url);
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `SNURR_CONFIG` environment variable, otherwise returns "snurr.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "snurr.conf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_prefix() {
        assert_eq!(ENV_PREFIX, "SNURR");
    }

    #[test]
    fn test_apply_env_overrides_no_vars() {
        env::remove_var("SNURR_NICKNAME");
        env::remove_var("SNURR_LEADERBOARD_ENABLED");
        env::remove_var("SNURR_LEADERBOARD_DATABASE_URL");

        let result = apply_env_overrides(Config::default());

        assert_eq!(result.bot.nickname, "snurr");
        assert!(!result.leaderboard.enabled);
        assert!(result.leaderboard.database_url.is_none());
    }
}
