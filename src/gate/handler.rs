//! The request gate itself.

use super::config::GateConfig;
use super::error::{GateError, GateResult};
use super::headers::SecurityHeaders;
use crate::access::{RoleAccessTable, SessionSource};
use crate::audit::{AuditCategory, AuditEvent, AuditSink};
use crate::http::{Request, Response};
use crate::rate_limit::{LimitPool, RateLimiter};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// What the caller should do with the request after gating.
#[derive(Debug)]
pub enum GateAction {
    /// Pass the (possibly annotated) request to the next handler.
    Forward(Request),
    /// Short-circuit with this response.
    Respond(Response),
}

/// Which gate step decided the request's fate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Framework asset, skipped all checks.
    StaticBypass,
    /// Public path, no auth required.
    PublicBypass,
    /// Rate limiter denied the request.
    RateLimited,
    /// No session on a protected path.
    RedirectLogin,
    /// Session role not permitted for the path.
    RedirectUnauthorized,
    /// All checks passed.
    Allowed,
    /// Internal fault, sent to the error page.
    Error,
}

/// Result of gating one request.
#[derive(Debug)]
pub struct GateOutcome {
    /// Step that decided the request.
    pub decision: GateDecision,
    /// What to do next.
    pub action: GateAction,
}

impl GateOutcome {
    fn new(decision: GateDecision, action: GateAction) -> Self {
        Self { decision, action }
    }
}

/// Gate counters.
#[derive(Debug, Default)]
pub struct GateStats {
    /// Requests forwarded after passing all checks.
    forwarded: AtomicU64,

    /// Static and public bypasses.
    bypassed: AtomicU64,

    /// 429 responses.
    rate_limited: AtomicU64,

    /// Login redirects.
    login_redirects: AtomicU64,

    /// Unauthorized redirects.
    unauthorized_redirects: AtomicU64,

    /// Internal faults translated to the error page.
    faults: AtomicU64,
}

impl GateStats {
    /// Requests forwarded after passing all checks.
    #[must_use]
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Static and public bypasses.
    #[must_use]
    pub fn bypassed(&self) -> u64 {
        self.bypassed.load(Ordering::Relaxed)
    }

    /// 429 responses.
    #[must_use]
    pub fn rate_limited(&self) -> u64 {
        self.rate_limited.load(Ordering::Relaxed)
    }

    /// Login redirects.
    #[must_use]
    pub fn login_redirects(&self) -> u64 {
        self.login_redirects.load(Ordering::Relaxed)
    }

    /// Unauthorized redirects.
    #[must_use]
    pub fn unauthorized_redirects(&self) -> u64 {
        self.unauthorized_redirects.load(Ordering::Relaxed)
    }

    /// Internal faults.
    #[must_use]
    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }
}

/// Per-request decision pipeline run at the edge, before any handler logic.
///
/// Every response produced here carries the security headers; responses from
/// forwarded requests are decorated by the caller via [`decorate`].
///
/// [`decorate`]: RequestGate::decorate
pub struct RequestGate {
    /// Path classification and redirect targets.
    config: GateConfig,

    /// Security response headers.
    headers: SecurityHeaders,

    /// Shared rate limiter.
    limiter: Arc<RateLimiter>,

    /// Protected-path role rules.
    table: RoleAccessTable,

    /// Session token decoder.
    sessions: Arc<dyn SessionSource>,

    /// Audit event destination.
    audit: Arc<dyn AuditSink>,

    /// Counters.
    stats: GateStats,
}

impl std::fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGate")
            .field("config", &self.config)
            .field("rules", &self.table.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl RequestGate {
    /// Create a new gate.
    #[must_use]
    pub fn new(
        config: GateConfig,
        limiter: Arc<RateLimiter>,
        table: RoleAccessTable,
        sessions: Arc<dyn SessionSource>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let headers = match &config.content_security_policy {
            Some(csp) => SecurityHeaders::with_csp(csp.clone()),
            None => SecurityHeaders::new(),
        };
        Self {
            config,
            headers,
            limiter,
            table,
            sessions,
            audit,
            stats: GateStats::default(),
        }
    }

    /// Gate one request.
    ///
    /// Never fails: internal faults are translated into a redirect to the
    /// error page and logged, so the caller always gets an actionable
    /// outcome.
    pub async fn evaluate(&self, request: Request) -> GateOutcome {
        let path = request.path().to_string();
        let ip = request.client_ip();

        match self.run_checks(request).await {
            Ok(outcome) => outcome,
            Err(err) => self.deny(err, &ip, &path).await,
        }
    }

    /// Attach the security headers to an upstream response.
    pub fn decorate(&self, response: &mut Response) {
        self.headers.apply(response);
    }

    /// Gate counters.
    #[must_use]
    pub fn stats(&self) -> &GateStats {
        &self.stats
    }

    /// The fallible pipeline; denials surface as `GateError`.
    async fn run_checks(&self, mut request: Request) -> GateResult<GateOutcome> {
        let path = request.path().to_string();

        if self.is_static(&path) {
            self.stats.bypassed.fetch_add(1, Ordering::Relaxed);
            return Ok(GateOutcome::new(
                GateDecision::StaticBypass,
                GateAction::Forward(request),
            ));
        }

        if path.starts_with(&self.config.api_prefix) {
            let ip = request.client_ip();
            let decision = self.limiter.consume(&ip, &path)?;
            request.set_header("x-ratelimit-limit", decision.limit.to_string());
            request.set_header("x-ratelimit-remaining", decision.remaining.to_string());
            request.set_header(
                "x-ratelimit-reset",
                decision.reset_after.as_secs().to_string(),
            );
        }

        if self.is_public(&path) {
            self.stats.bypassed.fetch_add(1, Ordering::Relaxed);
            return Ok(GateOutcome::new(
                GateDecision::PublicBypass,
                GateAction::Forward(request),
            ));
        }

        let token = self
            .sessions
            .decode(&request)
            .await
            .map_err(|e| GateError::Internal(format!("token decode failed: {e}")))?;

        if let Some(rule) = self.table.matching_rule(&path) {
            let Some(token) = token.as_ref() else {
                return Err(GateError::Unauthenticated);
            };

            match token.user_role.as_deref() {
                Some(role) if rule.allows(role) => {},
                other => {
                    return Err(GateError::Unauthorized {
                        required: rule
                            .roles_sorted()
                            .into_iter()
                            .map(str::to_string)
                            .collect(),
                        actual: other.map(str::to_string),
                    });
                },
            }
        }

        // Every allow is audited, role-checked or not
        let mut event =
            AuditEvent::info(AuditCategory::Auth, "Access allowed").with_field("path", &path);
        if let Some(token) = &token {
            if let Some(role) = &token.user_role {
                event = event.with_field("role", role);
            }
            if let Some(email) = &token.email {
                event = event.with_field("email", email);
            }
        }
        self.audit.emit(event).await;

        self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
        Ok(GateOutcome::new(
            GateDecision::Allowed,
            GateAction::Forward(request),
        ))
    }

    /// Translate a gate error into its terminal response.
    async fn deny(&self, err: GateError, ip: &str, path: &str) -> GateOutcome {
        match err {
            GateError::RateLimited(e) => {
                self.stats.rate_limited.fetch_add(1, Ordering::Relaxed);
                self.audit
                    .emit(
                        AuditEvent::warn(AuditCategory::Security, "Rate limit exceeded")
                            .with_field("ip", ip)
                            .with_field("path", path)
                            .with_field("error", e.to_string()),
                    )
                    .await;

                let limit = match self.limiter.pool_for(path) {
                    LimitPool::Auth => self.limiter.config().auth.max_points,
                    LimitPool::Api => self.limiter.config().api.max_points,
                };
                let body = json!({
                    "error": "Too many requests",
                    "message": "Please try again later",
                })
                .to_string();

                let mut response = Response::too_many_requests(e.retry_after_secs(), body)
                    .header("X-RateLimit-Limit", limit.to_string())
                    .header("X-RateLimit-Remaining", "0")
                    .build();
                self.headers.apply(&mut response);

                GateOutcome::new(GateDecision::RateLimited, GateAction::Respond(response))
            },
            GateError::Unauthenticated => {
                self.stats.login_redirects.fetch_add(1, Ordering::Relaxed);
                self.audit
                    .emit(
                        AuditEvent::info(AuditCategory::Auth, "Redirecting to login")
                            .with_field("ip", ip)
                            .with_field("path", path),
                    )
                    .await;

                GateOutcome::new(
                    GateDecision::RedirectLogin,
                    GateAction::Respond(self.redirect(&self.config.login_redirect)),
                )
            },
            GateError::Unauthorized { required, actual } => {
                self.stats
                    .unauthorized_redirects
                    .fetch_add(1, Ordering::Relaxed);
                self.audit
                    .emit(
                        AuditEvent::warn(AuditCategory::Security, "Role not permitted")
                            .with_field("ip", ip)
                            .with_field("path", path)
                            .with_field("required", &required)
                            .with_field("actual", actual.as_deref().unwrap_or("none")),
                    )
                    .await;

                GateOutcome::new(
                    GateDecision::RedirectUnauthorized,
                    GateAction::Respond(self.redirect(&self.config.unauthorized_redirect)),
                )
            },
            GateError::Internal(msg) => {
                self.stats.faults.fetch_add(1, Ordering::Relaxed);
                self.audit
                    .emit(
                        AuditEvent::error(AuditCategory::System, "Gate fault")
                            .with_field("ip", ip)
                            .with_field("path", path)
                            .with_field("error", msg),
                    )
                    .await;

                GateOutcome::new(
                    GateDecision::Error,
                    GateAction::Respond(self.redirect(&self.config.error_redirect)),
                )
            },
        }
    }

    /// Build a redirect response with the security headers attached.
    fn redirect(&self, location: &str) -> Response {
        let mut response = Response::see_other(location).build();
        self.headers.apply(&mut response);
        response
    }

    /// Framework assets and anything with a file extension skip the gate.
    fn is_static(&self, path: &str) -> bool {
        if self
            .config
            .static_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return true;
        }
        if path.contains("favicon.ico") {
            return true;
        }
        // Last path segment with a dot is a file request
        path.rsplit('/').next().is_some_and(|segment| segment.contains('.'))
    }

    /// Root and the login/auth/guest prefixes need no session.
    fn is_public(&self, path: &str) -> bool {
        path == "/"
            || self
                .config
                .public_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{
        AccessError, AccessResult, PathRuleConfig, SessionToken, TrustedHeaderSource,
    };
    use crate::audit::{AuditLevel, MemorySink};
    use crate::rate_limit::RateLimitConfig;
    use async_trait::async_trait;

    struct FailingSource;

    #[async_trait]
    impl SessionSource for FailingSource {
        async fn decode(&self, _request: &Request) -> AccessResult<Option<SessionToken>> {
            Err(AccessError::TokenError("verifier unreachable".to_string()))
        }
    }

    fn portal_gate() -> (RequestGate, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let table = RoleAccessTable::new(&[
            PathRuleConfig::new("/teacher", &["teacher", "admin"]),
            PathRuleConfig::new("/student", &["student", "admin"]),
            PathRuleConfig::new("/admin", &["admin"]),
        ])
        .unwrap();

        let gate = RequestGate::new(
            GateConfig::default(),
            Arc::new(RateLimiter::new(RateLimitConfig::default())),
            table,
            Arc::new(TrustedHeaderSource::new()),
            Arc::clone(&sink) as Arc<dyn AuditSink>,
        );
        (gate, sink)
    }

    fn request(path: &str) -> Request {
        Request::builder()
            .path(path)
            .header("x-forwarded-for", "203.0.113.7")
            .build()
    }

    fn request_as(path: &str, role: &str) -> Request {
        Request::builder()
            .path(path)
            .header("x-forwarded-for", "203.0.113.7")
            .header("x-portal-role", role)
            .header("x-portal-email", "user@school.example")
            .build()
    }

    fn respond(outcome: GateOutcome) -> Response {
        match outcome.action {
            GateAction::Respond(response) => response,
            GateAction::Forward(_) => panic!("expected a response"),
        }
    }

    #[tokio::test]
    async fn test_static_asset_bypasses_everything() {
        let (gate, sink) = portal_gate();

        for path in ["/_next/static/app.js", "/logo.png", "/favicon.ico"] {
            let outcome = gate.evaluate(request(path)).await;
            assert_eq!(outcome.decision, GateDecision::StaticBypass, "{path}");
        }
        assert!(sink.is_empty());
        assert_eq!(gate.stats().bypassed(), 3);
    }

    #[tokio::test]
    async fn test_public_paths_need_no_session() {
        let (gate, _) = portal_gate();

        for path in ["/", "/login", "/auth/signin", "/guest/timetable"] {
            let outcome = gate.evaluate(request(path)).await;
            assert_eq!(outcome.decision, GateDecision::PublicBypass, "{path}");
        }
    }

    #[tokio::test]
    async fn test_unprotected_path_forwards_without_session() {
        let (gate, _) = portal_gate();

        let outcome = gate.evaluate(request("/about")).await;
        assert_eq!(outcome.decision, GateDecision::Allowed);
        assert!(matches!(outcome.action, GateAction::Forward(_)));
    }

    #[tokio::test]
    async fn test_unprotected_allow_is_still_audited() {
        let (gate, sink) = portal_gate();

        let outcome = gate.evaluate(request("/about")).await;
        assert_eq!(outcome.decision, GateDecision::Allowed);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, AuditLevel::Info);
        assert_eq!(events[0].category, AuditCategory::Auth);
        assert_eq!(events[0].message, "Access allowed");
        assert_eq!(events[0].field_str("path"), Some("/about"));

        // An allowed API request is audited too
        gate.evaluate(request("/api/grades")).await;
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn test_protected_path_without_session_redirects_to_login() {
        let (gate, sink) = portal_gate();

        let outcome = gate.evaluate(request("/teacher/grades")).await;
        assert_eq!(outcome.decision, GateDecision::RedirectLogin);

        let response = respond(outcome);
        assert_eq!(response.status().as_u16(), 303);
        assert_eq!(response.header("location"), Some("/login"));
        assert_eq!(response.header("x-frame-options"), Some("DENY"));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, AuditLevel::Info);
        assert_eq!(events[0].category, AuditCategory::Auth);
        assert_eq!(events[0].field_str("path"), Some("/teacher/grades"));
    }

    #[tokio::test]
    async fn test_role_matrix() {
        let (gate, _) = portal_gate();

        let cases = [
            ("/teacher", "teacher", GateDecision::Allowed),
            ("/teacher", "admin", GateDecision::Allowed),
            ("/teacher", "student", GateDecision::RedirectUnauthorized),
            ("/student", "student", GateDecision::Allowed),
            ("/student", "admin", GateDecision::Allowed),
            ("/student", "teacher", GateDecision::RedirectUnauthorized),
            ("/admin", "admin", GateDecision::Allowed),
            ("/admin", "teacher", GateDecision::RedirectUnauthorized),
            ("/admin", "student", GateDecision::RedirectUnauthorized),
        ];

        for (path, role, expected) in cases {
            let outcome = gate.evaluate(request_as(path, role)).await;
            assert_eq!(outcome.decision, expected, "{role} on {path}");
        }
    }

    #[tokio::test]
    async fn test_unauthorized_redirect_and_audit() {
        let (gate, sink) = portal_gate();

        let outcome = gate.evaluate(request_as("/admin/users", "teacher")).await;
        let response = respond(outcome);
        assert_eq!(response.status().as_u16(), 303);
        assert_eq!(response.header("location"), Some("/unauthorized"));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, AuditLevel::Warn);
        assert_eq!(events[0].category, AuditCategory::Security);
        assert_eq!(events[0].field_str("actual"), Some("teacher"));
        assert_eq!(
            events[0].data["required"],
            serde_json::json!(["admin"])
        );
    }

    #[tokio::test]
    async fn test_session_without_role_claim_is_unauthorized() {
        let (gate, _) = portal_gate();

        let req = Request::builder()
            .path("/student")
            .header("x-portal-email", "guest@school.example")
            .build();

        let outcome = gate.evaluate(req).await;
        assert_eq!(outcome.decision, GateDecision::RedirectUnauthorized);
    }

    #[tokio::test]
    async fn test_sixth_auth_request_is_rejected() {
        let (gate, sink) = portal_gate();

        for _ in 0..5 {
            let outcome = gate.evaluate(request("/api/auth/session")).await;
            assert_eq!(outcome.decision, GateDecision::Allowed);
        }

        let outcome = gate.evaluate(request("/api/auth/session")).await;
        assert_eq!(outcome.decision, GateDecision::RateLimited);

        let response = respond(outcome);
        assert_eq!(response.status().as_u16(), 429);
        assert_eq!(response.header("retry-after"), Some("60"));
        assert_eq!(response.header("x-ratelimit-limit"), Some("5"));
        assert_eq!(response.header("x-ratelimit-remaining"), Some("0"));
        assert_eq!(response.header("x-content-type-options"), Some("nosniff"));

        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"], "Too many requests");
        assert_eq!(body["message"], "Please try again later");

        let events = sink.events();
        let denial = events.last().unwrap();
        assert_eq!(denial.level, AuditLevel::Warn);
        assert_eq!(denial.category, AuditCategory::Security);
        assert_eq!(denial.field_str("ip"), Some("203.0.113.7"));
        assert_eq!(denial.field_str("path"), Some("/api/auth/session"));
    }

    #[tokio::test]
    async fn test_forwarded_api_request_carries_limit_headers() {
        let (gate, _) = portal_gate();

        let outcome = gate.evaluate(request("/api/grades/export")).await;
        let GateAction::Forward(forwarded) = outcome.action else {
            panic!("expected forward");
        };
        assert_eq!(forwarded.header("x-ratelimit-limit"), Some("30"));
        assert_eq!(forwarded.header("x-ratelimit-remaining"), Some("29"));
        assert!(forwarded.header("x-ratelimit-reset").is_some());
    }

    #[tokio::test]
    async fn test_non_api_page_is_not_rate_limited() {
        let (gate, _) = portal_gate();

        for _ in 0..50 {
            let outcome = gate.evaluate(request_as("/teacher", "teacher")).await;
            assert_eq!(outcome.decision, GateDecision::Allowed);
        }
    }

    #[tokio::test]
    async fn test_decoder_fault_redirects_to_error_page() {
        let sink = Arc::new(MemorySink::new());
        let table =
            RoleAccessTable::new(&[PathRuleConfig::new("/teacher", &["teacher"])]).unwrap();
        let gate = RequestGate::new(
            GateConfig::default(),
            Arc::new(RateLimiter::with_defaults()),
            table,
            Arc::new(FailingSource),
            Arc::clone(&sink) as Arc<dyn AuditSink>,
        );

        let outcome = gate.evaluate(request("/teacher")).await;
        assert_eq!(outcome.decision, GateDecision::Error);

        let response = respond(outcome);
        assert_eq!(response.status().as_u16(), 303);
        assert_eq!(response.header("location"), Some("/error"));

        let events = sink.events();
        assert_eq!(events[0].level, AuditLevel::Error);
        assert_eq!(events[0].category, AuditCategory::System);
        assert_eq!(gate.stats().faults(), 1);
    }

    #[tokio::test]
    async fn test_decorate_applies_security_headers() {
        let (gate, _) = portal_gate();

        let mut response = Response::ok().body("hello").build();
        gate.decorate(&mut response);
        assert!(response.header("content-security-policy").is_some());
        assert_eq!(response.header("x-frame-options"), Some("DENY"));
    }

    #[tokio::test]
    async fn test_allow_emits_auth_event() {
        let (gate, sink) = portal_gate();

        gate.evaluate(request_as("/teacher", "teacher")).await;

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, AuditLevel::Info);
        assert_eq!(events[0].category, AuditCategory::Auth);
        assert_eq!(events[0].message, "Access allowed");
        assert_eq!(events[0].field_str("role"), Some("teacher"));
    }
}
