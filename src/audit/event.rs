//! Structured audit events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Severity of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    /// Routine events (allows, bypasses).
    Info,
    /// Denials and suspicious activity.
    Warn,
    /// Internal faults.
    Error,
}

/// Category of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditCategory {
    /// Authentication decisions.
    Auth,
    /// Security denials (rate limits, role mismatches).
    Security,
    /// Internal faults.
    System,
    /// General API traffic.
    Api,
}

/// A single structured audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,

    /// Severity.
    pub level: AuditLevel,

    /// Category.
    pub category: AuditCategory,

    /// Human-readable message.
    pub message: String,

    /// Structured detail fields.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub data: BTreeMap<String, serde_json::Value>,
}

impl AuditEvent {
    /// Create a new event at the given level.
    #[must_use]
    pub fn new(level: AuditLevel, category: AuditCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            category,
            message: message.into(),
            data: BTreeMap::new(),
        }
    }

    /// Create an info event.
    #[must_use]
    pub fn info(category: AuditCategory, message: impl Into<String>) -> Self {
        Self::new(AuditLevel::Info, category, message)
    }

    /// Create a warn event.
    #[must_use]
    pub fn warn(category: AuditCategory, message: impl Into<String>) -> Self {
        Self::new(AuditLevel::Warn, category, message)
    }

    /// Create an error event.
    #[must_use]
    pub fn error(category: AuditCategory, message: impl Into<String>) -> Self {
        Self::new(AuditLevel::Error, category, message)
    }

    /// Builder: add a detail field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.data.insert(key.into(), v);
        }
        self
    }

    /// Get a detail field as a string, if present.
    #[must_use]
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(serde_json::Value::as_str)
    }
}
