//! Role resolution for sign-in.

use std::collections::HashMap;

/// The one authoritative email-to-role mapping.
///
/// Both the sign-in flow (which mints the role claim into the session token)
/// and any administrative tooling resolve roles through this directory, so
/// trust decisions cannot diverge between code paths.
#[derive(Debug, Clone)]
pub struct RoleDirectory {
    /// Explicit assignments.
    assignments: HashMap<String, String>,

    /// Role used when an email has no explicit assignment.
    default_role: String,
}

impl RoleDirectory {
    /// Create a directory from explicit assignments and a default role.
    #[must_use]
    pub fn new(assignments: HashMap<String, String>, default_role: impl Into<String>) -> Self {
        Self {
            assignments,
            default_role: default_role.into(),
        }
    }

    /// Resolve the role for an account email.
    #[must_use]
    pub fn resolve(&self, email: &str) -> &str {
        self.assignments
            .get(email)
            .map_or(&self.default_role, String::as_str)
    }

    /// Whether the email has an explicit assignment.
    #[must_use]
    pub fn has_assignment(&self, email: &str) -> bool {
        self.assignments.contains_key(email)
    }

    /// The default role.
    #[must_use]
    pub fn default_role(&self) -> &str {
        &self.default_role
    }
}
