//! Error types for HTTP parsing and serialization.

use std::fmt;

/// Result type for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Errors that can occur while parsing or building HTTP messages.
#[derive(Debug)]
pub enum HttpError {
    /// Malformed request or response bytes.
    Parse(String),

    /// Request was truncated before the headers completed.
    Incomplete,

    /// Invalid URI in the request line.
    InvalidUri(String),

    /// Invalid HTTP method.
    InvalidMethod(String),

    /// I/O error while reading or writing.
    Io(std::io::Error),
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::Incomplete => write!(f, "incomplete request"),
            Self::InvalidUri(uri) => write!(f, "invalid URI: {uri}"),
            Self::InvalidMethod(m) => write!(f, "invalid method: {m}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<httparse::Error> for HttpError {
    fn from(e: httparse::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<std::io::Error> for HttpError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
