//! Per-identity token bucket with discrete periodic refill.

use crate::rate_limit::{Admission, RateLimitConfig};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Mutable state of one identity's bucket.
///
/// Invariant: `current_tokens <= capacity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BucketState {
    pub(crate) current_tokens: u64,
    pub(crate) last_refill: DateTime<Utc>,
}

impl BucketState {
    /// A fresh bucket at full capacity.
    pub(crate) fn full(config: &RateLimitConfig, now: DateTime<Utc>) -> Self {
        Self {
            current_tokens: config.capacity,
            last_refill: now,
        }
    }

    /// Apply the refill rule at `now`, then try to take one permit.
    ///
    /// Refill is all-or-nothing: once a whole period has elapsed since the
    /// last refill the bucket is reset to capacity and the period restarts
    /// at `now`.
    pub(crate) fn try_consume(&mut self, config: &RateLimitConfig, now: DateTime<Utc>) -> Admission {
        if self.elapsed(now) >= config.refill_period {
            self.current_tokens = config.capacity;
            self.last_refill = now;
        }

        if self.current_tokens > 0 {
            self.current_tokens -= 1;
            Admission::Admitted
        } else {
            Admission::Throttled {
                retry_after: self.retry_after(config, now),
            }
        }
    }

    /// Whole seconds until the next refill boundary, at least one.
    fn retry_after(&self, config: &RateLimitConfig, now: DateTime<Utc>) -> Duration {
        let remaining = config.refill_period.saturating_sub(self.elapsed(now));
        let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        Duration::from_secs(secs.max(1))
    }

    /// Time since the last refill. A clock that moved backwards counts as zero.
    fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.last_refill)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}
