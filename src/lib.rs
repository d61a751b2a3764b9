//! # Portal Gate
//!
//! Edge request-gating layer for the school portal. Every inbound request
//! passes one gate before reaching the application: security headers are
//! attached, API traffic is rate limited per client and path, and protected
//! pages are checked against a static role table.
//!
//! ## Features
//!
//! - Fixed-window rate limiting with separate auth and API pools
//! - Role-based access control with longest-prefix path rules
//! - Security response headers on every response, including rejections
//! - Structured audit events for every denial and allow decision
//!
//! ## Architecture
//!
//! The [`gate::RequestGate`] is the single decision point; the
//! [`server::PortalServer`] feeds it parsed requests and proxies forwarded
//! ones to the upstream application. The session token decode and the audit
//! sink are seams ([`access::SessionSource`], [`audit::AuditSink`]) so
//! deployments can plug in their own verifier and log pipeline.

pub mod access;
pub mod audit;
pub mod config;
pub mod gate;
pub mod http;
pub mod rate_limit;
pub mod server;
