//! Error types for fetching and parsing source records.
//!
//! [`FetchError`] covers everything that can go wrong talking to the remote
//! content API. [`ParseError`] describes why a single record was dropped
//! during normalization; it never aborts a run.

use std::fmt;
use thiserror::Error;

/// The category of a fetch error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorCode {
    /// Connection failed, timed out, or the body could not be read.
    Network,
    /// The server answered with a non-success status.
    HttpStatus,
    /// The body is not a JSON array of objects.
    InvalidBody,
    /// The HTTP client could not be set up.
    Client,
}

impl FetchErrorCode {
    /// Returns a stable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::HttpStatus => "http_status",
            Self::InvalidBody => "invalid_body",
            Self::Client => "client",
        }
    }
}

impl fmt::Display for FetchErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while fetching records from the remote source.
#[derive(Debug, Error)]
pub struct FetchError {
    /// The error code categorizing this error.
    code: FetchErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The URL that was requested, if known.
    url: Option<String>,
    /// HTTP status, for [`FetchErrorCode::HttpStatus`].
    status: Option<u16>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FetchError {
    /// Creates a new fetch error with the given code and message.
    pub fn new(code: FetchErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            url: None,
            status: None,
            source: None,
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::Network, message)
    }

    /// Creates an error for a non-success HTTP status.
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        let mut err = Self::new(FetchErrorCode::HttpStatus, message);
        err.status = Some(status);
        err
    }

    /// Creates an invalid body error.
    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::InvalidBody, message)
    }

    /// Creates a client setup error.
    pub fn client(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::Client, message)
    }

    /// Sets the requested URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> FetchErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the requested URL, if set.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Returns the HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref url) = self.url {
            write!(f, " ({})", url)?;
        }
        Ok(())
    }
}

/// A specialized Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Why a single source record could not be turned into an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A required field is absent or empty.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// A timestamp did not match the expected layout.
    #[error("invalid timestamp in '{field}': '{value}' does not match '{layout}'")]
    InvalidTimestamp {
        field: &'static str,
        value: String,
        layout: &'static str,
    },

    /// A wall-clock time that does not exist in the configured timezone.
    #[error("'{value}' in '{field}' does not exist in timezone {timezone}")]
    NonexistentLocalTime {
        field: &'static str,
        value: String,
        timezone: String,
    },

    /// The record does not have the expected shape.
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// A specialized Result type for record parsing.
pub type ParseResult<T> = Result<T, ParseError>;
