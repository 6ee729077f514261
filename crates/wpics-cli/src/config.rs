//! Configuration file and settings resolution.
//!
//! Flags and environment variables cover the deployment settings. The
//! optional `config.toml` (at `~/.config/wp-ics-gen/config.toml` by default)
//! holds the values that rarely change:
//!
//! ```toml
//! [calendar]
//! name = "Vereinstermine"
//! description = "Termine des Vereins"
//!
//! [calendar.organizer]
//! name = "Vorstand"
//! email = "vorstand@example.org"
//!
//! [page]
//! title = "Vereinstermine"
//! ```

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use url::Url;
use wpics_core::CalendarMeta;
use wpics_server::{PageSettings, ServerConfig};

use crate::cli::FeedArgs;
use crate::error::{CliError, CliResult};

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Calendar metadata.
    pub calendar: CalendarMeta,

    /// Landing page texts.
    pub page: PageSettings,
}

impl FileConfig {
    /// Loads the file given on the command line, or the default file when
    /// it exists.
    pub fn load(explicit: Option<&Path>) -> CliResult<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| CliError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wp-ics-gen")
    }
}

/// Merges flags and the configuration file into a server configuration.
///
/// The events URL is not checked here; commands that need it call
/// [`ServerConfig::validate`].
pub fn resolve(args: &FeedArgs, file: FileConfig) -> CliResult<ServerConfig> {
    let timezone = parse_timezone(&args.timezone)?;

    // The advertised timezone always matches the source timezone.
    let mut config = ServerConfig::new(args.events_url.clone().unwrap_or_default())
        .with_calendar(file.calendar)
        .with_page(file.page)
        .with_timezone(timezone)
        .with_check_interval(args.check_interval)
        .with_working_dir(&args.working_dir)
        .with_address(args.address);

    if let Some(base_url) = parse_base_url(&args.base_url)? {
        config = config.with_base_url(base_url);
    }
    Ok(config)
}

/// Parses an IANA timezone name.
pub fn parse_timezone(name: &str) -> CliResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| CliError::config(format!("invalid timezone '{}': {}", name, e)))
}

/// Parses the base URL; empty means none.
pub fn parse_base_url(value: &str) -> CliResult<Option<Url>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let url = Url::parse(value)
        .map_err(|e| CliError::config(format!("invalid base URL '{}': {}", value, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CliError::config(format!(
            "base URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(Some(url))
}
