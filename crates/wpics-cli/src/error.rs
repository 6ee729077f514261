//! CLI error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use wpics_core::TracingError;
use wpics_server::ServerError;
use wpics_source::FetchError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid or missing setting.
    #[error("configuration error: {0}")]
    Config(String),

    /// The configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid TOML.
    #[error("failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Server startup or shutdown failed.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The events collection could not be fetched.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Logging could not be set up.
    #[error(transparent)]
    Tracing(#[from] TracingError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpics_core::TracingOutputFormat;

    fn log_format(name: &str) -> CliResult<TracingOutputFormat> {
        Ok(name.parse::<TracingOutputFormat>()?)
    }

    #[test]
    fn tracing_errors_pass_through() {
        let err = log_format("xml").unwrap_err();
        assert!(matches!(err, CliError::Tracing(TracingError::UnknownFormat(_))));
        assert_eq!(
            err.to_string(),
            "unknown log format 'xml' (expected pretty, compact or json)"
        );
        assert!(log_format("json").is_ok());
    }

    #[test]
    fn config_error_display() {
        let err = CliError::config("events URL is empty");
        assert_eq!(err.to_string(), "configuration error: events URL is empty");
    }
}
