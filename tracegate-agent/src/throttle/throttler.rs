use super::{system_time_source, OverrideMap, TimeSource, TokenBucket};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const BALANCE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountOptions {
    pub credits_per_second: f64,
    pub max_balance: f64,
}

impl Default for AccountOptions {
    fn default() -> Self {
        Self {
            credits_per_second: 1.0,
            max_balance: 3.0,
        }
    }
}

#[derive(Clone)]
pub struct ThrottlerConfig {
    pub default_account: AccountOptions,
    /// Per-service account options; services not listed use the default.
    pub account_overrides: HashMap<String, AccountOptions>,
    pub client_max_balance: f64,
    pub max_operations: usize,
    pub ttl: Duration,
    pub purge_interval: Duration,
}

impl Default for ThrottlerConfig {
    fn default() -> Self {
        Self {
            default_account: AccountOptions::default(),
            account_overrides: HashMap::new(),
            client_max_balance: 2.0,
            max_operations: 200,
            ttl: Duration::from_secs(60 * 60),
            purge_interval: Duration::from_secs(60),
        }
    }
}

/// Spend exceeded the client's withdrawn balance; the caller marks the
/// trace as over-quota.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("overspend: requested {requested} credits with balance {balance}")]
pub struct OverspendError {
    pub requested: f64,
    pub balance: f64,
}

struct Account {
    options: AccountOptions,
    buckets: OverrideMap<TokenBucket>,
    time_now: TimeSource,
    updated_at: Instant,
}

impl Account {
    fn new(
        options: AccountOptions,
        max_operations: usize,
        time_now: TimeSource,
        now: Instant,
    ) -> Self {
        let default_bucket = TokenBucket::with_time_source(
            options.credits_per_second,
            options.max_balance,
            time_now.clone(),
        );
        Self {
            options,
            buckets: OverrideMap::new(max_operations, default_bucket),
            time_now,
            updated_at: now,
        }
    }

    fn withdraw(&mut self, operation: &str, max_withdrawal: f64) -> f64 {
        if !self.buckets.has(operation) {
            let bucket = TokenBucket::with_time_source(
                self.options.credits_per_second,
                self.options.max_balance,
                self.time_now.clone(),
            );
            self.buckets.set(operation, bucket);
        }
        self.buckets.get_mut(operation).withdraw(max_withdrawal)
    }
}

struct Client {
    per_operation_balance: HashMap<String, f64>,
    updated_at: Instant,
}

struct Inner {
    config: ThrottlerConfig,
    time_now: TimeSource,
    accounts: HashMap<String, Account>,
    clients: HashMap<String, Client>,
}

/// Credit store behind a single mutex, purged of idle accounts and clients
/// on a background ticker. `close()` (or drop) stops the ticker.
pub struct Throttler {
    inner: Arc<Mutex<Inner>>,
    shutdown: CancellationToken,
}

impl Throttler {
    /// Must be called within a tokio runtime: the purge loop is spawned
    /// immediately.
    pub fn new(config: ThrottlerConfig) -> Self {
        Self::with_time_source(config, system_time_source())
    }

    pub fn with_time_source(config: ThrottlerConfig, time_now: TimeSource) -> Self {
        let purge_interval = config.purge_interval;
        let inner = Arc::new(Mutex::new(Inner {
            config,
            time_now,
            accounts: HashMap::new(),
            clients: HashMap::new(),
        }));
        let shutdown = CancellationToken::new();

        let purge_inner = Arc::clone(&inner);
        let purge_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(purge_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = purge_shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        purge_expired(&mut purge_inner.lock().expect("throttler lock poisoned"));
                    }
                }
            }
        });

        Self { inner, shutdown }
    }

    /// Hands out up to `client_max_balance - current balance` credits for
    /// the given (service, operation), drawn from the service account.
    pub fn withdraw(&self, service: &str, client_id: &str, operation: &str) -> f64 {
        let mut guard = self.inner.lock().expect("throttler lock poisoned");
        let inner = &mut *guard;
        let now = (inner.time_now)();

        let account = inner.accounts.entry(service.to_string()).or_insert_with(|| {
            let options = inner
                .config
                .account_overrides
                .get(service)
                .copied()
                .unwrap_or(inner.config.default_account);
            Account::new(
                options,
                inner.config.max_operations,
                inner.time_now.clone(),
                now,
            )
        });
        let client = inner
            .clients
            .entry(client_id.to_string())
            .or_insert_with(|| Client {
                per_operation_balance: HashMap::new(),
                updated_at: now,
            });

        let balance = client
            .per_operation_balance
            .entry(operation.to_string())
            .or_insert(0.0);
        let max_withdrawal = (inner.config.client_max_balance - *balance).max(0.0);
        let credits = account.withdraw(operation, max_withdrawal);
        *balance += credits;
        account.updated_at = now;
        client.updated_at = now;
        credits
    }

    /// Deducts `credits` from the client's balance for `operation`.
    pub fn spend(
        &self,
        service: &str,
        client_id: &str,
        operation: &str,
        credits: f64,
    ) -> Result<(), OverspendError> {
        let mut guard = self.inner.lock().expect("throttler lock poisoned");
        let inner = &mut *guard;
        let now = (inner.time_now)();

        if let Some(account) = inner.accounts.get_mut(service) {
            account.updated_at = now;
        }
        let Some(client) = inner.clients.get_mut(client_id) else {
            return Err(OverspendError {
                requested: credits,
                balance: 0.0,
            });
        };
        client.updated_at = now;
        let balance = client
            .per_operation_balance
            .entry(operation.to_string())
            .or_insert(0.0);
        if credits > *balance + BALANCE_EPSILON {
            return Err(OverspendError {
                requested: credits,
                balance: *balance,
            });
        }
        *balance -= credits;
        Ok(())
    }

    /// Drops accounts and clients idle for longer than the TTL. The
    /// background ticker calls this on every interval.
    pub fn purge_expired(&self) {
        purge_expired(&mut self.inner.lock().expect("throttler lock poisoned"));
    }

    pub fn close(&self) {
        self.shutdown.cancel();
    }

    #[cfg(test)]
    fn counts(&self) -> (usize, usize) {
        let inner = self.inner.lock().unwrap();
        (inner.accounts.len(), inner.clients.len())
    }
}

impl Drop for Throttler {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn purge_expired(inner: &mut Inner) {
    let now = (inner.time_now)();
    let ttl = inner.config.ttl;
    inner
        .accounts
        .retain(|_, account| now.duration_since(account.updated_at) < ttl);
    inner
        .clients
        .retain(|_, client| now.duration_since(client.updated_at) < ttl);
}

#[cfg(test)]
mod tests {
    use super::super::testclock::MockClock;
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_config() -> ThrottlerConfig {
        ThrottlerConfig {
            default_account: AccountOptions {
                credits_per_second: 1.0,
                max_balance: 3.0,
            },
            account_overrides: HashMap::new(),
            client_max_balance: 2.0,
            max_operations: 1,
            ttl: Duration::from_secs(60),
            purge_interval: Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn client_balance_never_exceeds_cap() {
        let clock = MockClock::new();
        let throttler = Throttler::with_time_source(test_config(), clock.time_source());
        for _ in 0..10 {
            throttler.withdraw("svc", "client", "op");
            clock.advance(Duration::from_secs(10));
        }
        // A full withdrawal now must return zero: balance is at the cap.
        assert_eq!(throttler.withdraw("svc", "client", "op"), 0.0);
        throttler.spend("svc", "client", "op", 2.0).unwrap();
        assert!(throttler.spend("svc", "client", "op", 0.1).is_err());
    }

    #[tokio::test]
    async fn double_spend_is_rejected() {
        let clock = MockClock::new();
        let throttler = Throttler::with_time_source(test_config(), clock.time_source());
        let credits = throttler.withdraw("svc", "client", "op");
        assert_eq!(credits, 2.0);
        throttler.spend("svc", "client", "op", credits).unwrap();
        let err = throttler
            .spend("svc", "client", "op", credits)
            .unwrap_err();
        assert_eq!(err.balance, 0.0);
    }

    #[tokio::test]
    async fn overflowing_operations_share_the_default_bucket() {
        // MaxOperations = 1: op1 claims the only override; op2 lands on the
        // default bucket slot.
        let clock = MockClock::new();
        let throttler = Throttler::with_time_source(test_config(), clock.time_source());

        assert_eq!(throttler.withdraw("svc", "client", "op1"), 2.0);
        clock.advance(Duration::from_secs(1));
        assert_eq!(throttler.withdraw("svc", "client", "op1"), 0.0);
        throttler.spend("svc", "client", "op1", 2.0).unwrap();
        assert!(throttler.spend("svc", "client", "op1", 2.0).is_err());
        assert_eq!(throttler.withdraw("svc", "client", "op2"), 2.0);
        assert!(throttler.spend("svc", "client", "op1", 2.0).is_err());
        throttler.spend("svc", "client", "op2", 1.0).unwrap();
    }

    #[tokio::test]
    async fn purge_empties_idle_state() {
        let clock = MockClock::new();
        let throttler = Throttler::with_time_source(test_config(), clock.time_source());
        throttler.withdraw("svc", "client", "op");
        throttler.purge_expired();
        assert_eq!(throttler.counts(), (1, 1));
        clock.advance(Duration::from_secs(61));
        throttler.purge_expired();
        assert_eq!(throttler.counts(), (0, 0));
    }

    #[tokio::test]
    async fn unknown_client_cannot_spend() {
        let clock = MockClock::new();
        let throttler = Throttler::with_time_source(test_config(), clock.time_source());
        assert!(throttler.spend("svc", "ghost", "op", 1.0).is_err());
    }
}
