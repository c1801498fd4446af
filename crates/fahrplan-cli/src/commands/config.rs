//! Configuration commands.

use crate::config::CliConfig;
use crate::error::{ClientError, ClientResult};

/// Prints the effective configuration as TOML.
pub fn dump(config: &CliConfig) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::config(format!("failed to serialize config: {e}")))?;
    println!("# config.toml ({})", CliConfig::default_path().display());
    println!("{toml_str}");
    Ok(())
}

pub fn validate(config: &CliConfig) -> ClientResult<()> {
    config.validate()?;
    println!("Configuration is valid.");
    Ok(())
}

pub fn path() -> ClientResult<()> {
    println!("config: {}", CliConfig::default_path().display());
    Ok(())
}
