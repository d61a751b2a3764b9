//! Static role-access table with longest-prefix matching.

use super::config::PathRuleConfig;
use super::error::{AccessError, AccessResult};
use std::collections::HashSet;

/// One protected prefix and the roles permitted under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRule {
    /// Path prefix.
    prefix: String,

    /// Allowed role set.
    roles: HashSet<String>,
}

impl PathRule {
    /// Get the prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Check whether a role is allowed under this rule.
    #[must_use]
    pub fn allows(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Allowed roles, sorted for stable logging.
    #[must_use]
    pub fn roles_sorted(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = self.roles.iter().map(String::as_str).collect();
        roles.sort_unstable();
        roles
    }
}

/// Immutable prefix-to-roles lookup table.
///
/// Rules are sorted by descending prefix length at construction, so a lookup
/// is a linear scan that returns the longest matching prefix. Overlapping
/// prefixes are therefore deterministic; identical prefixes are rejected
/// outright.
#[derive(Debug, Clone)]
pub struct RoleAccessTable {
    /// Rules, longest prefix first.
    rules: Vec<PathRule>,
}

impl RoleAccessTable {
    /// Build a table from configuration rules.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::InvalidPrefix` for prefixes that are empty or
    /// not absolute, and `AccessError::DuplicatePrefix` when two rules name
    /// the same prefix.
    pub fn new(configs: &[PathRuleConfig]) -> AccessResult<Self> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(configs.len());

        for config in configs {
            if config.prefix.is_empty() || !config.prefix.starts_with('/') {
                return Err(AccessError::InvalidPrefix(config.prefix.clone()));
            }
            if !seen.insert(config.prefix.clone()) {
                return Err(AccessError::DuplicatePrefix(config.prefix.clone()));
            }
            if config.roles.is_empty() {
                return Err(AccessError::InvalidConfig(format!(
                    "rule for '{}' allows no roles",
                    config.prefix
                )));
            }

            rules.push(PathRule {
                prefix: config.prefix.clone(),
                roles: config.roles.iter().cloned().collect(),
            });
        }

        rules.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        Ok(Self { rules })
    }

    /// Find the longest-prefix rule matching a path, if any.
    #[must_use]
    pub fn matching_rule(&self, path: &str) -> Option<&PathRule> {
        self.rules.iter().find(|rule| path.starts_with(&rule.prefix))
    }

    /// Whether any rule protects this path.
    #[must_use]
    pub fn is_protected(&self, path: &str) -> bool {
        self.matching_rule(path).is_some()
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
