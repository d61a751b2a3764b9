//! Audit event sinks.

use super::event::{AuditEvent, AuditLevel};
use async_trait::async_trait;
use std::io::Write;
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Destination for audit events.
///
/// Delivery is best-effort: a slow or failing sink must not take the request
/// path down with it, so `emit` is infallible from the caller's view.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Deliver one event.
    async fn emit(&self, event: AuditEvent);
}

/// Sink writing one JSON object per line to stdout.
///
/// Also mirrors each event through `tracing` at the matching level so the
/// events land in whatever subscriber the process installed.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    /// Create a new stdout sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditSink for StdoutSink {
    async fn emit(&self, event: AuditEvent) {
        match event.level {
            AuditLevel::Info => info!(category = ?event.category, "{}", event.message),
            AuditLevel::Warn => warn!(category = ?event.category, "{}", event.message),
            AuditLevel::Error => error!(category = ?event.category, "{}", event.message),
        }

        if let Ok(line) = serde_json::to_string(&event) {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            let _ = writeln!(handle, "{line}");
        }
    }
}

/// Sink capturing events in memory, for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemorySink {
    /// Create a new memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of captured events.
    #[must_use]
    pub fn len(&self) -> usize {
        match self.events.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Whether no events were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
