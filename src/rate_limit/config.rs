//! Rate limiting configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one bucket pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Points available per window.
    pub max_points: u64,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl PoolConfig {
    /// Create a new pool configuration.
    #[must_use]
    pub fn new(max_points: u64, window_secs: u64) -> Self {
        Self {
            max_points,
            window_secs,
        }
    }

    /// Window length as a `Duration`.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Rate limiting configuration: two independent pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled.
    pub enabled: bool,

    /// Path prefix routed to the stricter auth pool.
    pub auth_prefix: String,

    /// Pool for authentication endpoints.
    pub auth: PoolConfig,

    /// Pool for general API endpoints.
    pub api: PoolConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auth_prefix: "/api/auth".to_string(),
            auth: PoolConfig::new(5, 60),
            api: PoolConfig::new(30, 60),
        }
    }
}

impl RateLimitConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth_prefix.is_empty() || !self.auth_prefix.starts_with('/') {
            return Err(format!(
                "auth_prefix must be an absolute path, got '{}'",
                self.auth_prefix
            ));
        }
        for (name, pool) in [("auth", &self.auth), ("api", &self.api)] {
            if pool.max_points == 0 {
                return Err(format!("{name} pool max_points must be nonzero"));
            }
            if pool.window_secs == 0 {
                return Err(format!("{name} pool window_secs must be nonzero"));
            }
        }
        Ok(())
    }
}
