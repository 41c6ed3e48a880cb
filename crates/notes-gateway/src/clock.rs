//! Time source for token issuance and admission control.
//!
//! Production code uses [`SystemClock`]. `MockClock` (cfg(test) or the
//! `test-utils` feature) lets tests step time across token expiry and
//! refill boundaries deterministically.

use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + Debug {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock implementation using `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockClock;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use super::Clock;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Controllable clock for tests.
    ///
    /// Clones share the same underlying time, so advancing one clone is
    /// visible through the gateway's copy.
    #[derive(Debug, Clone)]
    pub struct MockClock {
        current_time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl MockClock {
        /// Create a mock clock starting at `start`.
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                current_time: Arc::new(Mutex::new(start)),
            }
        }

        /// Create a mock clock at `secs` seconds past the Unix epoch.
        pub fn at_epoch_seconds(secs: i64) -> Self {
            Self::new(DateTime::from_timestamp(secs, 0).unwrap_or_default())
        }

        /// Advance the clock by `secs` seconds.
        pub fn advance_secs(&self, secs: i64) {
            let mut time = self
                .current_time
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *time += Duration::seconds(secs);
        }

        /// Set the clock to a specific instant.
        pub fn set(&self, instant: DateTime<Utc>) {
            let mut time = self
                .current_time
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *time = instant;
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .current_time
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
        }
    }
}
