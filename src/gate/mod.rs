//! # Request Gate
//!
//! The edge decision layer run once per inbound request, before any page or
//! handler logic. In fixed order: security-header injection, static-asset
//! bypass, rate limiting for API paths, public-path bypass, authentication,
//! and role checks. Each step is a hard gate; failing one short-circuits the
//! rest. Any unexpected fault is translated into a redirect to the error
//! page and never propagates to the caller.

mod config;
mod error;
mod handler;
mod headers;

pub use config::GateConfig;
pub use error::{GateError, GateResult};
pub use handler::{GateAction, GateDecision, GateOutcome, GateStats, RequestGate};
pub use headers::SecurityHeaders;
