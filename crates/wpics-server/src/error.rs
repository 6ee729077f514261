//! Server error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Result type for snapshot operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors that can occur while starting or running the feed server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (listener, accept loop, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The listen address could not be bound.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a bind error.
    pub fn bind(address: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }
}

/// Errors reading or writing the snapshot file.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The snapshot could not be read.
    #[error("Failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The previous snapshot could not be removed.
    #[error("Failed to remove snapshot {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The snapshot could not be written.
    #[error("Failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PersistError {
    /// Returns the snapshot path involved.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Read { path, .. } | Self::Remove { path, .. } | Self::Write { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ServerError::config("events URL is empty");
        assert_eq!(err.to_string(), "Configuration error: events URL is empty");
    }

    #[test]
    fn bind_error_display() {
        let err = ServerError::bind(
            "0.0.0.0:80",
            io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        );
        assert!(err.to_string().contains("0.0.0.0:80"));
    }

    #[test]
    fn persist_error_path() {
        let err = PersistError::Write {
            path: PathBuf::from("/data/events.ics"),
            source: io::Error::other("disk full"),
        };
        assert_eq!(err.path(), &PathBuf::from("/data/events.ics"));
        assert!(err.to_string().contains("disk full"));
    }
}
