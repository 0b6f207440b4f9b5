//! Monitor error types

use thiserror::Error;

/// Errors that can occur while configuring or running the monitor
///
/// Classification itself never fails: unrecognised requests are reported as
/// the `(unknown, unknown)` requirement instead.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// A required configuration value is absent
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// A configuration value is present but malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The rule table could not be turned into a route index
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// An observed request could not be interpreted
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A permission log or capture file line could not be parsed
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl MonitorError {
    /// Create a missing-configuration error
    pub fn missing(name: impl Into<String>) -> Self {
        MonitorError::MissingConfig(name.into())
    }

    /// Create an invalid-configuration error
    pub fn invalid(msg: impl Into<String>) -> Self {
        MonitorError::InvalidConfig(msg.into())
    }
}

/// Result type alias for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Failure of a secondary lookup against the hosting API
///
/// These stay inside the resolver: a failed visibility check fails closed and
/// a failed disambiguation becomes the unknown requirement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The API answered with a non-200 status
    #[error("unexpected status {0}")]
    Status(u16),

    /// The request did not complete within the client timeout
    #[error("lookup timed out")]
    Timeout,

    /// Connection or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered 200 but the body was not the expected resource
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LookupError::Timeout
        } else if err.is_decode() {
            LookupError::UnexpectedShape(err.to_string())
        } else {
            LookupError::Transport(err.to_string())
        }
    }
}

/// Result type alias for secondary lookups
pub type LookupResult<T> = Result<T, LookupError>;
