//! Gate configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the request gate's path classification and redirects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Prefix under which requests are rate limited.
    pub api_prefix: String,

    /// Prefixes that bypass authentication entirely.
    pub public_prefixes: Vec<String>,

    /// Framework-asset prefixes that bypass all checks.
    pub static_prefixes: Vec<String>,

    /// Redirect target when no session is present on a protected path.
    pub login_redirect: String,

    /// Redirect target when the session role is not permitted.
    pub unauthorized_redirect: String,

    /// Redirect target for internal gate faults.
    pub error_redirect: String,

    /// Content-Security-Policy override; `None` uses the portal default.
    pub content_security_policy: Option<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api/".to_string(),
            public_prefixes: vec![
                "/login".to_string(),
                "/auth".to_string(),
                "/guest".to_string(),
            ],
            static_prefixes: vec![
                "/_next/static".to_string(),
                "/_next/image".to_string(),
                "/static/".to_string(),
            ],
            login_redirect: "/login".to_string(),
            unauthorized_redirect: "/unauthorized".to_string(),
            error_redirect: "/error".to_string(),
            content_security_policy: None,
        }
    }
}

impl GateConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        for (name, target) in [
            ("login_redirect", &self.login_redirect),
            ("unauthorized_redirect", &self.unauthorized_redirect),
            ("error_redirect", &self.error_redirect),
        ] {
            if !target.starts_with('/') || target.starts_with("//") {
                return Err(format!("{name} must be a local absolute path, got '{target}'"));
            }
        }
        if !self.api_prefix.starts_with('/') {
            return Err(format!(
                "api_prefix must be an absolute path, got '{}'",
                self.api_prefix
            ));
        }
        for prefix in self.public_prefixes.iter().chain(&self.static_prefixes) {
            if !prefix.starts_with('/') {
                return Err(format!("prefix must be an absolute path, got '{prefix}'"));
            }
        }
        Ok(())
    }
}
