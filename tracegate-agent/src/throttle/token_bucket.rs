use super::{system_time_source, TimeSource};
use std::time::Instant;

/// Continuous-refill token bucket. The balance accrues
/// `credits_per_second` between withdrawals, capped at `max_balance`, and
/// starts full so new accounts can emit immediately.
pub struct TokenBucket {
    credits_per_second: f64,
    balance: f64,
    max_balance: f64,
    last_tick: Instant,
    time_now: TimeSource,
}

impl TokenBucket {
    pub fn new(credits_per_second: f64, max_balance: f64) -> Self {
        Self::with_time_source(credits_per_second, max_balance, system_time_source())
    }

    pub fn with_time_source(
        credits_per_second: f64,
        max_balance: f64,
        time_now: TimeSource,
    ) -> Self {
        let last_tick = time_now();
        Self {
            credits_per_second,
            balance: max_balance,
            max_balance,
            last_tick,
            time_now,
        }
    }

    /// Returns up to `max_withdrawal` credits, never more than the refilled
    /// balance. The result is always within `[0, max_balance]`.
    pub fn withdraw(&mut self, max_withdrawal: f64) -> f64 {
        let now = (self.time_now)();
        let elapsed = now.duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;
        self.balance =
            (self.balance + elapsed * self.credits_per_second).min(self.max_balance);
        let credits = self.balance.min(max_withdrawal).max(0.0);
        self.balance -= credits;
        credits
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }
}

#[cfg(test)]
mod tests {
    use super::super::testclock::MockClock;
    use super::*;
    use std::time::Duration;

    #[test]
    fn starts_full_and_caps_at_max_balance() {
        let clock = MockClock::new();
        let mut bucket = TokenBucket::with_time_source(1.0, 3.0, clock.time_source());
        assert_eq!(bucket.withdraw(10.0), 3.0);
        clock.advance(Duration::from_secs(100));
        assert_eq!(bucket.withdraw(10.0), 3.0);
    }

    #[test]
    fn refills_continuously_between_withdrawals() {
        let clock = MockClock::new();
        let mut bucket = TokenBucket::with_time_source(2.0, 10.0, clock.time_source());
        assert_eq!(bucket.withdraw(10.0), 10.0);
        clock.advance(Duration::from_millis(1500));
        assert!((bucket.withdraw(10.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn withdrawal_sum_is_bounded_by_supply() {
        // Over any interval the credits handed out cannot exceed
        // max_balance + credits_per_second * elapsed.
        let clock = MockClock::new();
        let mut bucket = TokenBucket::with_time_source(1.0, 3.0, clock.time_source());
        let mut total = 0.0;
        for _ in 0..50 {
            total += bucket.withdraw(0.4);
            clock.advance(Duration::from_millis(100));
        }
        let elapsed = 5.0;
        assert!(total <= 3.0 + elapsed + 1e-9, "withdrew {total}");
    }

    #[test]
    fn never_goes_negative() {
        let clock = MockClock::new();
        let mut bucket = TokenBucket::with_time_source(1.0, 1.0, clock.time_source());
        assert_eq!(bucket.withdraw(5.0), 1.0);
        assert_eq!(bucket.withdraw(5.0), 0.0);
        assert!(bucket.balance() >= 0.0);
    }
}
