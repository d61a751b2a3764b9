//! Error types for rate limiting.

use std::fmt;
use std::time::Duration;

/// Result type for rate limiting operations.
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// Errors that can occur during rate limiting.
#[derive(Debug, Clone)]
pub enum RateLimitError {
    /// The bucket for this key is exhausted within the active window.
    Exceeded {
        /// The bucket key (`pool:ip:path`).
        key: String,
        /// Time remaining until the window resets.
        retry_after: Duration,
    },

    /// Invalid configuration.
    InvalidConfig(String),
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exceeded { key, retry_after } => {
                write!(
                    f,
                    "rate limit exceeded for {key}, retry after {}s",
                    retry_after.as_secs()
                )
            },
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for RateLimitError {}

impl RateLimitError {
    /// `Retry-After` value in whole seconds, rounded up and at least 1.
    #[must_use]
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            Self::Exceeded { retry_after, .. } => {
                (retry_after.as_secs_f64().ceil() as u64).max(1)
            },
            Self::InvalidConfig(_) => 1,
        }
    }

    /// Whether the client can recover by retrying later.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Exceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RateLimitError::Exceeded {
            key: "api:1.2.3.4:/api/grades".to_string(),
            retry_after: Duration::from_secs(42),
        };
        assert_eq!(
            err.to_string(),
            "rate limit exceeded for api:1.2.3.4:/api/grades, retry after 42s"
        );

        let err = RateLimitError::InvalidConfig("zero window".to_string());
        assert_eq!(err.to_string(), "invalid configuration: zero window");
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let err = RateLimitError::Exceeded {
            key: "k".to_string(),
            retry_after: Duration::from_millis(59_950),
        };
        assert_eq!(err.retry_after_secs(), 60);

        let err = RateLimitError::Exceeded {
            key: "k".to_string(),
            retry_after: Duration::from_millis(10),
        };
        assert_eq!(err.retry_after_secs(), 1);
    }

    #[test]
    fn test_is_recoverable() {
        let err = RateLimitError::Exceeded {
            key: "k".to_string(),
            retry_after: Duration::ZERO,
        };
        assert!(err.is_recoverable());
        assert!(!RateLimitError::InvalidConfig("x".to_string()).is_recoverable());
    }
}
