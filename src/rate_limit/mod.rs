//! # Rate Limiting Module
//!
//! Fixed-window point buckets keyed by client IP and request path.
//!
//! Two independent pools exist: a strict pool for authentication endpoints
//! and a looser pool for general API endpoints. Which pool applies is decided
//! once per request from the path string alone. Buckets are created lazily on
//! first use and reset wholesale when their window elapses; a `consume` call
//! never over-admits under concurrent access.
//!
//! State is process-local. A multi-instance deployment needs an external
//! shared counter store behind the same `consume` signature.

mod bucket;
mod config;
mod error;
mod limiter;

pub use bucket::{ConsumeOutcome, PointBucket};
pub use config::{PoolConfig, RateLimitConfig};
pub use error::{RateLimitError, RateLimitResult};
pub use limiter::{LimitPool, RateLimitDecision, RateLimiter};
