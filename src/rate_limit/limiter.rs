//! Two-pool rate limiter keyed by client IP and path.

use super::bucket::{ConsumeOutcome, PointBucket};
use super::config::{PoolConfig, RateLimitConfig};
use super::error::{RateLimitError, RateLimitResult};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Which pool served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitPool {
    /// Authentication endpoints (strict).
    Auth,
    /// General API endpoints.
    Api,
}

impl LimitPool {
    /// Short name used in bucket keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Api => "api",
        }
    }
}

/// Successful consume result.
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    /// Points left in the window after this consume.
    pub remaining: u64,

    /// Pool maximum.
    pub limit: u64,

    /// Time until the window resets.
    pub reset_after: Duration,

    /// Pool that served the request.
    pub pool: LimitPool,
}

/// Entry in the bucket cache.
struct BucketEntry {
    bucket: Arc<PointBucket>,
    created_at: Instant,
}

/// Fixed-window rate limiter with independent auth and API pools.
pub struct RateLimiter {
    /// Configuration.
    config: RateLimitConfig,

    /// Per-key point buckets.
    buckets: RwLock<HashMap<String, BucketEntry>>,

    /// Stats: total consume calls.
    total_checks: AtomicU64,

    /// Stats: total allowed.
    total_allowed: AtomicU64,

    /// Stats: total denied.
    total_denied: AtomicU64,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("total_checks", &self.total_checks)
            .field("total_allowed", &self.total_allowed)
            .field("total_denied", &self.total_denied)
            .finish()
    }
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: RwLock::new(HashMap::new()),
            total_checks: AtomicU64::new(0),
            total_allowed: AtomicU64::new(0),
            total_denied: AtomicU64::new(0),
        }
    }

    /// Create a rate limiter with the default portal policy.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default())
    }

    /// Pool for a given path: auth-prefixed paths use the strict pool.
    #[must_use]
    pub fn pool_for(&self, path: &str) -> LimitPool {
        if path.starts_with(&self.config.auth_prefix) {
            LimitPool::Auth
        } else {
            LimitPool::Api
        }
    }

    /// Consume one point for the given client IP and path.
    ///
    /// # Errors
    ///
    /// Returns `RateLimitError::Exceeded` with the bucket key and the time
    /// remaining in the window when the bucket is exhausted.
    pub fn consume(&self, ip: &str, path: &str) -> RateLimitResult<RateLimitDecision> {
        self.total_checks.fetch_add(1, Ordering::Relaxed);

        if !self.config.enabled {
            self.total_allowed.fetch_add(1, Ordering::Relaxed);
            return Ok(RateLimitDecision {
                remaining: u64::MAX,
                limit: u64::MAX,
                reset_after: Duration::ZERO,
                pool: LimitPool::Api,
            });
        }

        let pool = self.pool_for(path);
        let pool_config = match pool {
            LimitPool::Auth => &self.config.auth,
            LimitPool::Api => &self.config.api,
        };

        let mut key = String::with_capacity(pool.as_str().len() + ip.len() + path.len() + 2);
        let _ = write!(key, "{}:{ip}:{path}", pool.as_str());

        let bucket = self.get_or_create_bucket(&key, pool_config);

        match bucket.consume() {
            ConsumeOutcome::Consumed {
                remaining,
                reset_after,
            } => {
                self.total_allowed.fetch_add(1, Ordering::Relaxed);
                Ok(RateLimitDecision {
                    remaining,
                    limit: pool_config.max_points,
                    reset_after,
                    pool,
                })
            },
            ConsumeOutcome::Exhausted { retry_after } => {
                self.total_denied.fetch_add(1, Ordering::Relaxed);
                Err(RateLimitError::Exceeded { key, retry_after })
            },
        }
    }

    /// Get or create the bucket for a key.
    fn get_or_create_bucket(&self, key: &str, pool: &PoolConfig) -> Arc<PointBucket> {
        // Try read lock first
        {
            let buckets = match self.buckets.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(entry) = buckets.get(key) {
                return Arc::clone(&entry.bucket);
            }
        }

        let mut buckets = match self.buckets.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Double-check after acquiring write lock
        if let Some(entry) = buckets.get(key) {
            return Arc::clone(&entry.bucket);
        }

        let bucket = Arc::new(PointBucket::new(pool.max_points, pool.window()));
        buckets.insert(
            key.to_string(),
            BucketEntry {
                bucket: Arc::clone(&bucket),
                created_at: Instant::now(),
            },
        );

        bucket
    }

    /// Drop buckets older than `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        let mut buckets = match self.buckets.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        buckets.retain(|_, entry| now.duration_since(entry.created_at) < max_age);
    }

    /// Number of live buckets.
    #[must_use]
    pub fn active_bucket_count(&self) -> usize {
        match self.buckets.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Total consume calls.
    #[must_use]
    pub fn total_checks(&self) -> u64 {
        self.total_checks.load(Ordering::Relaxed)
    }

    /// Total allowed.
    #[must_use]
    pub fn total_allowed(&self) -> u64 {
        self.total_allowed.load(Ordering::Relaxed)
    }

    /// Total denied.
    #[must_use]
    pub fn total_denied(&self) -> u64 {
        self.total_denied.load(Ordering::Relaxed)
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}
