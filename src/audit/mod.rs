//! # Audit Module
//!
//! Structured audit events emitted by the request gate: every allow, deny,
//! and internal fault becomes an `{timestamp, level, category, message,
//! data}` event delivered to a pluggable sink. The sink is injected into the
//! gate; there is no global logger state.

mod event;
mod sink;

pub use event::{AuditCategory, AuditEvent, AuditLevel};
pub use sink::{AuditSink, MemorySink, StdoutSink};
