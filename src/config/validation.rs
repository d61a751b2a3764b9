//! Configuration validation system.

use super::types::PortalConfig;
use crate::access::RoleAccessTable;

/// A single validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// Error message.
    pub message: String,
    /// Severity level.
    pub severity: ValidationSeverity,
}

impl ValidationError {
    /// Create a new error.
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Error,
        }
    }

    /// Create a new warning.
    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Warning,
        }
    }
}

/// Severity of validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Error - configuration is invalid.
    Error,
    /// Warning - configuration may have issues.
    Warning,
}

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty (valid) result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error to the result.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Check if the validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self
            .errors
            .iter()
            .any(|e| e.severity == ValidationSeverity::Error)
    }

    /// Get all validation errors.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Get only warnings.
    #[must_use]
    pub fn warnings(&self) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ValidationSeverity::Warning)
            .collect()
    }
}

/// Trait for configuration validators.
pub trait Validator: std::fmt::Debug + Send + Sync {
    /// Validate the configuration.
    fn validate(&self, config: &PortalConfig) -> ValidationResult;
}

/// Validates the sections each config type can check on its own.
#[derive(Debug, Default)]
pub struct BasicValidator;

impl Validator for BasicValidator {
    fn validate(&self, config: &PortalConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        if config.server.bind_port == 0 {
            result.add_error(ValidationError::error(
                "server.bind_port",
                "bind port must be nonzero",
            ));
        }
        if config.server.upstream.is_empty() {
            result.add_error(ValidationError::error(
                "server.upstream",
                "upstream address must be set",
            ));
        }
        if config.server.read_timeout_secs == 0 {
            result.add_error(ValidationError::error(
                "server.read_timeout_secs",
                "read timeout must be nonzero",
            ));
        }
        if let Err(message) = config.rate_limit.validate() {
            result.add_error(ValidationError::error("rate_limit", message));
        }
        if let Err(message) = config.gate.validate() {
            result.add_error(ValidationError::error("gate", message));
        }

        result
    }
}

/// Validates the access rules by attempting to build the role table.
#[derive(Debug, Default)]
pub struct AccessRuleValidator;

impl Validator for AccessRuleValidator {
    fn validate(&self, config: &PortalConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Err(err) = RoleAccessTable::new(&config.access.protected) {
            result.add_error(ValidationError::error("access.protected", err.to_string()));
        }
        if config.access.default_role.is_empty() {
            result.add_error(ValidationError::error(
                "access.default_role",
                "default role must be set",
            ));
        }
        if config.access.protected.is_empty() {
            result.add_error(ValidationError::warning(
                "access.protected",
                "no protected paths configured; all pages are open",
            ));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::PathRuleConfig;

    #[test]
    fn test_default_config_is_valid() {
        let config = PortalConfig::default();
        assert!(BasicValidator.validate(&config).is_valid());
        assert!(AccessRuleValidator.validate(&config).is_valid());
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = PortalConfig::default();
        config.server.bind_port = 0;

        let result = BasicValidator.validate(&config);
        assert!(!result.is_valid());
        assert_eq!(result.errors()[0].field, "server.bind_port");
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let mut config = PortalConfig::default();
        config
            .access
            .protected
            .push(PathRuleConfig::new("/teacher", &["admin"]));

        let result = AccessRuleValidator.validate(&config);
        assert!(!result.is_valid());
    }

    #[test]
    fn test_empty_rules_is_warning_not_error() {
        let mut config = PortalConfig::default();
        config.access.protected.clear();

        let result = AccessRuleValidator.validate(&config);
        assert!(result.is_valid());
        assert_eq!(result.warnings().len(), 1);
    }
}
