//! Configuration parsing and types.

pub mod cli;
pub mod env;
pub mod parser;
pub mod types;
pub mod validate;

pub use parser::load_config;
pub use types::*;

use crate::common::error::ConfigError;

/// Load the config file, apply environment overrides and validate the result
/// against the server settings from the command line.
pub fn load_and_validate(path: &str, server: &ServerConfig) -> Result<Config, ConfigError> {
    let config = env::apply_env_overrides(load_config(path)?);
    validate::validate_config(&config, server)?;
    Ok(config)
}
