//! Configuration commands.

use wpics_server::ServerConfig;

use crate::config::FileConfig;
use crate::error::{CliError, CliResult};

/// Dumps the effective calendar and page settings as TOML.
pub fn dump(config: &ServerConfig) -> CliResult<()> {
    let effective = FileConfig {
        calendar: config.calendar.clone(),
        page: config.page.clone(),
    };
    let toml_str = toml::to_string_pretty(&effective)
        .map_err(|e| CliError::config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", FileConfig::default_path().display());
    println!("{}", toml_str);
    Ok(())
}

/// Validates the configuration.
pub fn validate(config: &ServerConfig) -> CliResult<()> {
    config.validate()?;
    println!("Configuration is valid.");
    Ok(())
}

/// Shows the configuration file path.
pub fn path() -> CliResult<()> {
    println!("config: {}", FileConfig::default_path().display());
    Ok(())
}
