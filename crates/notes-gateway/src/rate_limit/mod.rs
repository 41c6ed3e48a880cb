//! Per-identity admission control.
//!
//! [`RateLimiterRegistry`] owns one token bucket per identity, created on
//! first use. The registry is constructed once at startup and shared
//! through the router state; it has no global instance.
//!
//! # Concurrency
//!
//! - Get-or-create goes through `DashMap::entry`, so concurrent first
//!   requests for one identity share a single bucket
//! - Each bucket sits behind its own mutex; the map shard lock is released
//!   before the bucket is touched, so identities never wait on each other
//! - The kill switch is an `AtomicBool` read once per check
//!
//! Buckets are never evicted. Memory grows with the number of distinct
//! identities seen since startup.

mod bucket;

use crate::config::Config;
use crate::observability::metrics;
use bucket::BucketState;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::instrument;

/// Process-wide refill rule shared by every bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Permits per period. Zero rejects every request while enabled.
    pub capacity: u64,

    /// Time after which an exhausted bucket is reset to `capacity`.
    pub refill_period: Duration,
}

impl RateLimitConfig {
    pub fn new(capacity: u64, refill_period: Duration) -> Self {
        Self {
            capacity,
            refill_period,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.rate_limit_capacity, config.rate_limit_refill_period)
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A permit was consumed.
    Admitted,

    /// The limiter is disabled; nothing was consumed or created.
    Bypassed,

    /// No permit left in the current period.
    Throttled {
        /// Time until the identity's next refill boundary, whole seconds, at least 1s.
        retry_after: Duration,
    },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Admission::Throttled { .. })
    }

    /// Bounded label for metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Admission::Admitted => "admitted",
            Admission::Bypassed => "bypassed",
            Admission::Throttled { .. } => "throttled",
        }
    }
}

/// Registry of per-identity token buckets.
#[derive(Debug)]
pub struct RateLimiterRegistry {
    config: RateLimitConfig,
    buckets: DashMap<String, Arc<Mutex<BucketState>>>,
    enabled: AtomicBool,
}

impl RateLimiterRegistry {
    /// Create an enabled registry with no buckets.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Check and consume one permit for `identity` at `now`.
    #[instrument(skip_all, name = "gateway.rate_limit.check")]
    pub fn check(&self, identity: &str, now: DateTime<Utc>) -> Admission {
        if !self.enabled.load(Ordering::Acquire) {
            return Admission::Bypassed;
        }

        let bucket = self.bucket_for(identity, now);
        let mut state = bucket.lock().unwrap_or_else(PoisonError::into_inner);
        let admission = state.try_consume(&self.config, now);

        if let Admission::Throttled { retry_after } = admission {
            tracing::debug!(
                target: "gateway.rate_limit",
                retry_after_secs = retry_after.as_secs(),
                "Request throttled"
            );
        }

        admission
    }

    /// Boolean form of [`check`](Self::check).
    pub fn admit(&self, identity: &str, now: DateTime<Utc>) -> bool {
        self.check(identity, now).is_admitted()
    }

    /// Discard `identity`'s bucket; the next check starts at full capacity.
    pub fn reset(&self, identity: &str) {
        if self.buckets.remove(identity).is_some() {
            tracing::info!(target: "gateway.rate_limit", "Rate limit bucket reset");
            metrics::set_rate_limit_buckets(self.buckets.len());
        }
    }

    /// Flip the process-wide kill switch. Disabled means every check admits
    /// without touching any bucket.
    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            tracing::info!(target: "gateway.rate_limit", enabled, "Rate limiting toggled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Number of identities with a bucket.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Permits currently stored for `identity`, without applying refill.
    ///
    /// `None` if the identity has no bucket.
    pub fn remaining(&self, identity: &str) -> Option<u64> {
        let bucket = self.buckets.get(identity).map(|b| Arc::clone(b.value()))?;
        let state = bucket.lock().unwrap_or_else(PoisonError::into_inner);
        Some(state.current_tokens)
    }

    fn bucket_for(&self, identity: &str, now: DateTime<Utc>) -> Arc<Mutex<BucketState>> {
        if let Some(existing) = self.buckets.get(identity) {
            return Arc::clone(existing.value());
        }

        let (bucket, created) = match self.buckets.entry(identity.to_string()) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let bucket = Arc::new(Mutex::new(BucketState::full(&self.config, now)));
                entry.insert(Arc::clone(&bucket));
                (bucket, true)
            }
        };

        if created {
            tracing::debug!(target: "gateway.rate_limit", "Created rate limit bucket");
            metrics::set_rate_limit_buckets(self.buckets.len());
        }

        bucket
    }
}
