//! Adaptive client throttling: credits are abstract permission-to-emit
//! units refilled over time. Each service gets an account of token buckets;
//! each client instance gets per-operation balances capped by
//! `client_max_balance`.

mod override_map;
mod throttler;
mod token_bucket;

pub use override_map::OverrideMap;
pub use throttler::{AccountOptions, OverspendError, Throttler, ThrottlerConfig};
pub use token_bucket::TokenBucket;

use std::sync::Arc;
use std::time::Instant;

/// Injected wall clock; production code uses `Instant::now`, tests use a
/// controllable source.
pub type TimeSource = Arc<dyn Fn() -> Instant + Send + Sync>;

pub fn system_time_source() -> TimeSource {
    Arc::new(Instant::now)
}

#[cfg(test)]
pub(crate) mod testclock {
    use super::TimeSource;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// Deterministic clock that only moves when told to.
    pub struct MockClock {
        base: Instant,
        offset_micros: AtomicU64,
    }

    impl MockClock {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                base: Instant::now(),
                offset_micros: AtomicU64::new(0),
            })
        }

        pub fn advance(&self, by: Duration) {
            self.offset_micros
                .fetch_add(by.as_micros() as u64, Ordering::SeqCst);
        }

        pub fn time_source(self: &Arc<Self>) -> TimeSource {
            let clock = Arc::clone(self);
            Arc::new(move || {
                clock.base + Duration::from_micros(clock.offset_micros.load(Ordering::SeqCst))
            })
        }
    }
}
