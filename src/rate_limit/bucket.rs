//! Fixed-window point bucket.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Outcome of a single consume attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// A point was consumed.
    Consumed {
        /// Points left in the current window.
        remaining: u64,
        /// Time until the window resets.
        reset_after: Duration,
    },
    /// No points left in the current window.
    Exhausted {
        /// Time remaining in the current window.
        retry_after: Duration,
    },
}

/// A thread-safe fixed-window point bucket.
///
/// The bucket starts full. Each consume takes one point; when the window
/// elapses the counter resets wholesale to the maximum (fixed window, not
/// sliding). The read-then-increment is a CAS loop, so concurrent consumers
/// can never take more than `max_points` points from one window.
#[derive(Debug)]
pub struct PointBucket {
    /// Points per window.
    max_points: u64,

    /// Window length in nanoseconds.
    window_nanos: u64,

    /// Points consumed in the current window.
    used: AtomicU64,

    /// Current window start (nanoseconds since creation).
    window_start_nanos: AtomicU64,

    /// Creation instant for time calculations.
    created_at: Instant,
}

impl PointBucket {
    /// Create a new bucket. The first window starts now.
    #[must_use]
    pub fn new(max_points: u64, window: Duration) -> Self {
        Self {
            max_points,
            window_nanos: window.as_nanos() as u64,
            used: AtomicU64::new(0),
            window_start_nanos: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }

    /// Maximum points per window.
    #[must_use]
    pub fn max_points(&self) -> u64 {
        self.max_points
    }

    /// Try to consume one point.
    pub fn consume(&self) -> ConsumeOutcome {
        let now = self.now_nanos();
        self.maybe_reset(now);

        loop {
            let used = self.used.load(Ordering::Acquire);

            if used >= self.max_points {
                return ConsumeOutcome::Exhausted {
                    retry_after: self.time_until_reset(now),
                };
            }

            match self.used.compare_exchange_weak(
                used,
                used + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return ConsumeOutcome::Consumed {
                        remaining: self.max_points - used - 1,
                        reset_after: self.time_until_reset(now),
                    }
                },
                Err(_) => continue, // Retry on contention
            }
        }
    }

    /// Points left in the current window.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.maybe_reset(self.now_nanos());
        self.max_points
            .saturating_sub(self.used.load(Ordering::Acquire))
    }

    /// Time until the current window resets.
    #[must_use]
    pub fn time_until_reset(&self, now_nanos: u64) -> Duration {
        let start = self.window_start_nanos.load(Ordering::Acquire);
        let end = start + self.window_nanos;
        Duration::from_nanos(end.saturating_sub(now_nanos))
    }

    /// Nanoseconds elapsed since bucket creation.
    fn now_nanos(&self) -> u64 {
        self.created_at.elapsed().as_nanos() as u64
    }

    /// Start a fresh window if the current one has elapsed.
    fn maybe_reset(&self, now_nanos: u64) {
        let start = self.window_start_nanos.load(Ordering::Acquire);

        if now_nanos >= start + self.window_nanos
            && self
                .window_start_nanos
                .compare_exchange(start, now_nanos, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            self.used.store(0, Ordering::Release);
        }
    }
}
