use super::{Discoverer, DiscoveryError, Notifier};
use crate::tchannel::Pool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct PeerListManagerConfig {
    /// Number of peers to keep probe connections open to.
    pub min_peers: usize,
    /// Per-dial timeout for probe connections.
    pub conn_check_timeout: Duration,
    /// How often the connection floor is re-checked.
    pub conn_check_interval: Duration,
}

impl Default for PeerListManagerConfig {
    fn default() -> Self {
        Self {
            min_peers: 3,
            conn_check_timeout: Duration::from_millis(250),
            conn_check_interval: Duration::from_secs(10),
        }
    }
}

/// Keeps the pool's peer set current from a discoverer (initial pull) and a
/// notifier (pushed replacements), and maintains at least `min_peers` open
/// connections while enough instances exist.
pub struct PeerListManager {
    shutdown: CancellationToken,
}

impl PeerListManager {
    /// The initial discovery error surfaces here; push updates after
    /// startup are applied best-effort.
    pub async fn start(
        pool: Arc<Pool>,
        discoverer: Arc<dyn Discoverer>,
        notifier: Arc<dyn Notifier>,
        config: PeerListManagerConfig,
    ) -> Result<Self, DiscoveryError> {
        let instances = discoverer.instances().await?;
        pool.set_peers(&instances);

        let (tx, mut rx) = mpsc::unbounded_channel();
        notifier.register(tx);

        let shutdown = CancellationToken::new();
        let loop_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.conn_check_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = loop_shutdown.cancelled() => break,
                    update = rx.recv() => {
                        match update {
                            Some(instances) => {
                                tracing::debug!(peers = instances.len(), "peer set updated");
                                pool.set_peers(&instances);
                            }
                            None => break,
                        }
                    }
                    _ = ticker.tick() => {
                        let connected = pool
                            .ensure_connections(config.min_peers, config.conn_check_timeout)
                            .await;
                        if connected < config.min_peers {
                            tracing::warn!(
                                connected,
                                min_peers = config.min_peers,
                                "below minimum peer connections"
                            );
                        }
                    }
                }
            }
        });

        Ok(Self { shutdown })
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for PeerListManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Dispatcher, FixedDiscoverer};
    use super::*;
    use crate::testsupport::MockCollector;
    use pretty_assertions::assert_eq;

    fn test_config() -> PeerListManagerConfig {
        PeerListManagerConfig {
            min_peers: 2,
            conn_check_timeout: Duration::from_millis(250),
            conn_check_interval: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn keeps_min_peers_connections_open() {
        let first = MockCollector::start(false).await;
        let second = MockCollector::start(false).await;
        let pool = Arc::new(Pool::new("tracegate-agent", Duration::from_millis(250)));
        let discoverer: Arc<dyn Discoverer> =
            Arc::new(FixedDiscoverer::new(vec![first.address(), second.address()]));
        let notifier: Arc<dyn Notifier> = Arc::new(Dispatcher::new());

        let manager = PeerListManager::start(
            Arc::clone(&pool),
            discoverer,
            notifier,
            test_config(),
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(pool.connected_count().await >= 2);
        manager.stop();
    }

    #[tokio::test]
    async fn notifier_updates_replace_the_peer_set() {
        let pool = Arc::new(Pool::new("tracegate-agent", Duration::from_millis(250)));
        let discoverer: Arc<dyn Discoverer> =
            Arc::new(FixedDiscoverer::new(vec!["127.0.0.1:1".to_string()]));
        let notifier = Arc::new(Dispatcher::new());

        let manager = PeerListManager::start(
            Arc::clone(&pool),
            discoverer,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            test_config(),
        )
        .await
        .unwrap();
        assert_eq!(pool.peer_addresses(), vec!["127.0.0.1:1".to_string()]);

        notifier.notify(vec!["127.0.0.1:2".to_string(), "127.0.0.1:3".to_string()]);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut addresses = pool.peer_addresses();
        addresses.sort();
        assert_eq!(
            addresses,
            vec!["127.0.0.1:2".to_string(), "127.0.0.1:3".to_string()]
        );
        manager.stop();
    }
}
