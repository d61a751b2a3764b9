//! Configuration type definitions.

use crate::access::AccessConfig;
use crate::gate::GateConfig;
use crate::rate_limit::RateLimitConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

/// Root configuration structure for the portal gate.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PortalConfig {
    /// Listener and upstream configuration.
    pub server: ServerSection,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Rate limiter pools.
    pub rate_limit: RateLimitConfig,

    /// Role-based access rules and assignments.
    pub access: AccessConfig,

    /// Path classification and redirect targets.
    pub gate: GateConfig,
}

/// Server section configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Bind address for the listener.
    pub bind_address: IpAddr,

    /// Listener port.
    pub bind_port: u16,

    /// Upstream address requests are proxied to after gating.
    pub upstream: String,

    /// Per-read timeout in seconds.
    pub read_timeout_secs: u64,

    /// Maximum requests served over one keep-alive connection.
    pub max_keepalive_requests: u32,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            bind_port: 8080,
            upstream: "127.0.0.1:3000".to_string(),
            read_timeout_secs: 30,
            max_keepalive_requests: 100,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: LogLevel,

    /// Log format (json, pretty, compact).
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level (most verbose).
    Trace,
    /// Debug level.
    Debug,
    /// Info level (default).
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level (least verbose).
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines.
    Json,
    /// Human-readable with color.
    #[default]
    Pretty,
    /// Single-line compact.
    Compact,
}
