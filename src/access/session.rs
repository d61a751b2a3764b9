//! Session token seam to the external authentication layer.

use super::error::AccessResult;
use crate::http::Request;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Decoded session token payload as the gate consumes it.
///
/// The token itself is minted and signed by the authentication collaborator;
/// only the decoded claims cross this boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    /// Role claim, if the sign-in flow assigned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,

    /// Account email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl SessionToken {
    /// Create a token with a role claim.
    #[must_use]
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            user_role: Some(role.into()),
            email: None,
        }
    }
}

/// Source of decoded session tokens.
///
/// Implementations wrap the external token verifier. `Ok(None)` means the
/// request carries no session; `Err` means decoding itself failed and is
/// treated by the gate as an internal fault.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Decode the session token for a request, if present.
    async fn decode(&self, request: &Request) -> AccessResult<Option<SessionToken>>;
}

/// Session source that trusts identity headers set by the auth terminator.
///
/// Deployments run the gate behind the authentication proxy, which verifies
/// the signed session cookie and forwards the decoded claims as headers.
#[derive(Debug, Clone)]
pub struct TrustedHeaderSource {
    /// Header carrying the role claim.
    role_header: String,

    /// Header carrying the account email.
    email_header: String,
}

impl TrustedHeaderSource {
    /// Create a source reading the default portal headers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            role_header: "x-portal-role".to_string(),
            email_header: "x-portal-email".to_string(),
        }
    }

    /// Create a source with custom header names.
    #[must_use]
    pub fn with_headers(role_header: impl Into<String>, email_header: impl Into<String>) -> Self {
        Self {
            role_header: role_header.into(),
            email_header: email_header.into(),
        }
    }
}

impl Default for TrustedHeaderSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionSource for TrustedHeaderSource {
    async fn decode(&self, request: &Request) -> AccessResult<Option<SessionToken>> {
        let role = request.header(&self.role_header);
        let email = request.header(&self.email_header);

        if role.is_none() && email.is_none() {
            return Ok(None);
        }

        Ok(Some(SessionToken {
            user_role: role.map(str::to_string),
            email: email.map(str::to_string),
        }))
    }
}

/// Source that fills a missing role claim from the role directory.
///
/// Sessions minted before an account's role was assigned carry an email but
/// no role claim; those resolve through the directory the same way sign-in
/// does, so the gate never sees a divergent role.
pub struct DirectorySource<S> {
    inner: S,
    directory: super::roles::RoleDirectory,
}

impl<S: SessionSource> DirectorySource<S> {
    /// Wrap a source with directory-backed role resolution.
    #[must_use]
    pub fn new(inner: S, directory: super::roles::RoleDirectory) -> Self {
        Self { inner, directory }
    }
}

#[async_trait]
impl<S: SessionSource> SessionSource for DirectorySource<S> {
    async fn decode(&self, request: &Request) -> AccessResult<Option<SessionToken>> {
        let Some(mut token) = self.inner.decode(request).await? else {
            return Ok(None);
        };

        if token.user_role.is_none() {
            if let Some(email) = &token.email {
                token.user_role = Some(self.directory.resolve(email).to_string());
            }
        }

        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_headers_means_no_session() {
        let source = TrustedHeaderSource::new();
        let request = Request::builder().path("/teacher").build();
        assert_eq!(source.decode(&request).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_role_header_decoded() {
        let source = TrustedHeaderSource::new();
        let request = Request::builder()
            .path("/teacher")
            .header("x-portal-role", "teacher")
            .header("x-portal-email", "hana@school.example")
            .build();

        let token = source.decode(&request).await.unwrap().unwrap();
        assert_eq!(token.user_role.as_deref(), Some("teacher"));
        assert_eq!(token.email.as_deref(), Some("hana@school.example"));
    }

    #[tokio::test]
    async fn test_email_without_role() {
        let source = TrustedHeaderSource::new();
        let request = Request::builder()
            .path("/teacher")
            .header("x-portal-email", "guest@school.example")
            .build();

        let token = source.decode(&request).await.unwrap().unwrap();
        assert_eq!(token.user_role, None);
    }

    #[tokio::test]
    async fn test_directory_source_fills_missing_role() {
        use crate::access::RoleDirectory;
        use std::collections::HashMap;

        let mut assignments = HashMap::new();
        assignments.insert("head@school.example".to_string(), "admin".to_string());
        let source = DirectorySource::new(
            TrustedHeaderSource::new(),
            RoleDirectory::new(assignments, "student"),
        );

        let request = Request::builder()
            .path("/admin")
            .header("x-portal-email", "head@school.example")
            .build();
        let token = source.decode(&request).await.unwrap().unwrap();
        assert_eq!(token.user_role.as_deref(), Some("admin"));

        let request = Request::builder()
            .path("/student")
            .header("x-portal-email", "newkid@school.example")
            .build();
        let token = source.decode(&request).await.unwrap().unwrap();
        assert_eq!(token.user_role.as_deref(), Some("student"));

        // An explicit claim is never overridden
        let request = Request::builder()
            .path("/teacher")
            .header("x-portal-role", "teacher")
            .header("x-portal-email", "head@school.example")
            .build();
        let token = source.decode(&request).await.unwrap().unwrap();
        assert_eq!(token.user_role.as_deref(), Some("teacher"));
    }

    #[tokio::test]
    async fn test_custom_header_names() {
        let source = TrustedHeaderSource::with_headers("x-auth-role", "x-auth-user");
        let request = Request::builder()
            .path("/admin")
            .header("x-auth-role", "admin")
            .build();

        let token = source.decode(&request).await.unwrap().unwrap();
        assert_eq!(token.user_role.as_deref(), Some("admin"));
    }
}
