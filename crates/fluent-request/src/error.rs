//! HTTP error types

use thiserror::Error;

/// Result type used across the crate
pub type Result<T, E = HttpError> = std::result::Result<T, E>;

/// Errors produced while configuring, sending or decoding a request
///
/// Configuration failures (`InvalidUrl`, `InvalidHeader`, `MissingHeaderValues`,
/// `NilUrl`, `Serialization`) are recorded on the [`Request`](crate::Request)
/// and only surface once it is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// The URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// A header was set without any value
    #[error("missing values for set header \"{0}\"")]
    MissingHeaderValues(String),
    /// Header name or value is not valid HTTP
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// The request has no URL
    #[error("cannot add query param to nil url")]
    NilUrl,
    /// HTTP error with status code
    #[error("HTTP error ({status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),
    /// Request timeout
    #[error("Request timeout")]
    Timeout,
    /// The request context was cancelled
    #[error("Request cancelled")]
    Cancelled,
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Client build error
    #[error("Client build error: {0}")]
    Build(String),
    /// A rejected response, with its body attached
    #[error("error: {source}, content={content}")]
    WithContent {
        /// Error returned by the response check
        source: Box<HttpError>,
        /// Body of the rejected response, or the error hit while reading it
        content: String,
    },
    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpError::Timeout
        } else if err.is_builder() {
            HttpError::Build(err.to_string())
        } else if err.is_connect() {
            HttpError::Connection(err.to_string())
        } else if err.is_decode() {
            HttpError::Serialization(err.to_string())
        } else if let Some(status) = err.status() {
            HttpError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            HttpError::Other(err.to_string())
        }
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        HttpError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for HttpError {
    fn from(err: url::ParseError) -> Self {
        HttpError::InvalidUrl(err.to_string())
    }
}
