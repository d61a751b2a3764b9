//! Error taxonomy for the request gate.

use crate::rate_limit::RateLimitError;
use std::fmt;

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;

/// Errors arising while gating a request.
///
/// All four variants are caught inside the gate and translated into a
/// response or redirect; none propagate to the caller.
#[derive(Debug)]
pub enum GateError {
    /// The rate limiter denied the request (surfaced as 429).
    RateLimited(RateLimitError),

    /// No session on a protected path (surfaced as a login redirect).
    Unauthenticated,

    /// Session role not permitted for the path (surfaced as an
    /// unauthorized redirect).
    Unauthorized {
        /// Roles the matched rule allows.
        required: Vec<String>,
        /// Role the session carried, if any.
        actual: Option<String>,
    },

    /// Unexpected fault in token or audit handling (surfaced as an error
    /// redirect, never a raw 5xx).
    Internal(String),
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited(e) => write!(f, "{e}"),
            Self::Unauthenticated => write!(f, "no session token on protected path"),
            Self::Unauthorized { required, actual } => write!(
                f,
                "role {:?} not in required set {:?}",
                actual.as_deref().unwrap_or("none"),
                required
            ),
            Self::Internal(msg) => write!(f, "gate internal error: {msg}"),
        }
    }
}

impl std::error::Error for GateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RateLimited(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RateLimitError> for GateError {
    fn from(e: RateLimitError) -> Self {
        Self::RateLimited(e)
    }
}

impl From<crate::access::AccessError> for GateError {
    fn from(e: crate::access::AccessError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl GateError {
    /// Whether the client can recover by changing its behavior.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_display() {
        assert_eq!(
            GateError::Unauthenticated.to_string(),
            "no session token on protected path"
        );

        let err = GateError::Unauthorized {
            required: vec!["admin".to_string()],
            actual: Some("teacher".to_string()),
        };
        assert!(err.to_string().contains("teacher"));
        assert!(err.to_string().contains("admin"));
    }

    #[test]
    fn test_from_rate_limit() {
        let err: GateError = RateLimitError::Exceeded {
            key: "k".to_string(),
            retry_after: Duration::from_secs(1),
        }
        .into();
        assert!(matches!(err, GateError::RateLimited(_)));
        assert!(err.is_recoverable());
        assert!(!GateError::Internal("x".to_string()).is_recoverable());
    }
}
