//! Access control configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One protected path rule as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRuleConfig {
    /// Path prefix the rule covers.
    pub prefix: String,

    /// Roles allowed under the prefix.
    pub roles: Vec<String>,
}

impl PathRuleConfig {
    /// Create a new rule.
    #[must_use]
    pub fn new(prefix: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            prefix: prefix.into(),
            roles: roles.iter().map(|r| (*r).to_string()).collect(),
        }
    }
}

/// Access control configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Protected path rules.
    pub protected: Vec<PathRuleConfig>,

    /// Email to role assignments used at sign-in.
    pub assignments: HashMap<String, String>,

    /// Role assigned when an email has no explicit assignment.
    pub default_role: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            protected: vec![
                PathRuleConfig::new("/teacher", &["teacher", "admin"]),
                PathRuleConfig::new("/student", &["student", "admin"]),
                PathRuleConfig::new("/admin", &["admin"]),
            ],
            assignments: HashMap::new(),
            default_role: "student".to_string(),
        }
    }
}
