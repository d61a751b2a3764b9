//! Error types for access control.

use std::fmt;

/// Result type for access control operations.
pub type AccessResult<T> = Result<T, AccessError>;

/// Errors that can occur during access control.
#[derive(Debug)]
pub enum AccessError {
    /// Invalid configuration.
    InvalidConfig(String),

    /// Two protected rules share the same prefix.
    DuplicatePrefix(String),

    /// A protected prefix is not an absolute path.
    InvalidPrefix(String),

    /// Session token decoding failed.
    TokenError(String),
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::DuplicatePrefix(prefix) => write!(f, "duplicate protected prefix: {prefix}"),
            Self::InvalidPrefix(prefix) => write!(f, "invalid protected prefix: {prefix}"),
            Self::TokenError(msg) => write!(f, "token error: {msg}"),
        }
    }
}

impl std::error::Error for AccessError {}

impl AccessError {
    /// Whether this is a configuration-time error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_) | Self::DuplicatePrefix(_) | Self::InvalidPrefix(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AccessError::DuplicatePrefix("/teacher".to_string());
        assert_eq!(err.to_string(), "duplicate protected prefix: /teacher");

        let err = AccessError::TokenError("bad signature".to_string());
        assert_eq!(err.to_string(), "token error: bad signature");
    }

    #[test]
    fn test_is_config_error() {
        assert!(AccessError::DuplicatePrefix("/x".to_string()).is_config_error());
        assert!(!AccessError::TokenError("x".to_string()).is_config_error());
    }
}
