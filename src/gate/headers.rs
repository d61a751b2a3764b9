//! Security response headers.

use crate::http::Response;

/// Default content security policy for the portal, allowing the Google
/// sign-in origins the frontend talks to.
pub const DEFAULT_CSP: &str = "default-src 'self'; \
    script-src 'self' 'unsafe-inline' 'unsafe-eval' https://accounts.google.com https://apis.google.com; \
    style-src 'self' 'unsafe-inline'; \
    img-src 'self' data: https:; \
    frame-src 'self' https://accounts.google.com; \
    connect-src 'self' https://accounts.google.com https://www.googleapis.com;";

/// The fixed set of security headers attached to every response, including
/// rejections and redirects.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    /// Content-Security-Policy value.
    csp: String,
}

impl SecurityHeaders {
    /// Create headers with the default portal policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            csp: DEFAULT_CSP.to_string(),
        }
    }

    /// Create headers with a custom content security policy.
    #[must_use]
    pub fn with_csp(csp: impl Into<String>) -> Self {
        Self { csp: csp.into() }
    }

    /// All header name/value pairs.
    #[must_use]
    pub fn pairs(&self) -> [(&'static str, &str); 6] {
        [
            ("Content-Security-Policy", self.csp.as_str()),
            ("X-Content-Type-Options", "nosniff"),
            ("X-Frame-Options", "DENY"),
            ("X-XSS-Protection", "1; mode=block"),
            ("Referrer-Policy", "strict-origin-when-cross-origin"),
            (
                "Permissions-Policy",
                "camera=(), microphone=(), geolocation=()",
            ),
        ]
    }

    /// Attach all security headers to a response.
    pub fn apply(&self, response: &mut Response) {
        for (name, value) in self.pairs() {
            response.set_header(name, value);
        }
    }
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_headers_applied() {
        let headers = SecurityHeaders::new();
        let mut response = Response::ok().build();
        headers.apply(&mut response);

        assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
        assert_eq!(response.header("x-frame-options"), Some("DENY"));
        assert_eq!(response.header("x-xss-protection"), Some("1; mode=block"));
        assert_eq!(
            response.header("referrer-policy"),
            Some("strict-origin-when-cross-origin")
        );
        assert_eq!(
            response.header("permissions-policy"),
            Some("camera=(), microphone=(), geolocation=()")
        );
        assert!(response
            .header("content-security-policy")
            .unwrap()
            .starts_with("default-src 'self';"));
    }

    #[test]
    fn test_custom_csp() {
        let headers = SecurityHeaders::with_csp("default-src 'none';");
        let mut response = Response::ok().build();
        headers.apply(&mut response);
        assert_eq!(
            response.header("content-security-policy"),
            Some("default-src 'none';")
        );
    }
}
