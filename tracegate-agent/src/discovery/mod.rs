//! Upstream collector discovery: a [`Discoverer`] answers one-shot pulls of
//! the current instance set, a [`Notifier`] pushes updates, and the
//! [`PeerListManager`] keeps the connection pool's membership in sync while
//! holding a minimum number of probe connections open.

mod peer_list;

pub use peer_list::{PeerListManager, PeerListManagerConfig};

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("discovery failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Discoverer: Send + Sync {
    async fn instances(&self) -> Result<Vec<String>, DiscoveryError>;
}

pub trait Notifier: Send + Sync {
    /// Registers an observer for instance-set updates. Updates are full
    /// replacements, so delivery is idempotent.
    fn register(&self, observer: mpsc::UnboundedSender<Vec<String>>);
}

/// Discoverer over a static instance list.
pub struct FixedDiscoverer {
    instances: Vec<String>,
}

impl FixedDiscoverer {
    pub fn new(instances: Vec<String>) -> Self {
        Self { instances }
    }
}

#[async_trait]
impl Discoverer for FixedDiscoverer {
    async fn instances(&self) -> Result<Vec<String>, DiscoveryError> {
        Ok(self.instances.clone())
    }
}

/// Fan-out notifier: `notify` pushes a replacement instance set to every
/// registered observer. Closed observers are dropped on the way.
#[derive(Default)]
pub struct Dispatcher {
    observers: Mutex<Vec<mpsc::UnboundedSender<Vec<String>>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self, instances: Vec<String>) {
        let mut observers = self.observers.lock().expect("dispatcher lock poisoned");
        observers.retain(|observer| observer.send(instances.clone()).is_ok());
    }
}

impl Notifier for Dispatcher {
    fn register(&self, observer: mpsc::UnboundedSender<Vec<String>>) {
        self.observers
            .lock()
            .expect("dispatcher lock poisoned")
            .push(observer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_discoverer_returns_instances() {
        let discoverer = FixedDiscoverer::new(vec!["127.0.0.1:1".to_string()]);
        assert_eq!(
            discoverer.instances().await.unwrap(),
            vec!["127.0.0.1:1".to_string()]
        );
    }

    #[tokio::test]
    async fn dispatcher_fans_out_and_drops_closed_observers() {
        let dispatcher = Dispatcher::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        dispatcher.register(tx1);
        dispatcher.register(tx2);
        drop(rx2);

        dispatcher.notify(vec!["a".to_string()]);
        assert_eq!(rx1.recv().await.unwrap(), vec!["a".to_string()]);
        assert_eq!(dispatcher.observers.lock().unwrap().len(), 1);
    }
}
