use super::{Connection, TchannelError};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// A peer's connection slot: ready (Some), being dialed (locked), or down.
type PeerState = Arc<tokio::sync::Mutex<Option<Connection>>>;

/// Connection pool over the current peer set. Membership is driven from the
/// peer-list manager; calls pick peers round-robin, preferring ones that
/// already hold an open connection, and re-dial lazily after failures.
pub struct Pool {
    caller_name: String,
    connect_timeout: Duration,
    peers: Mutex<HashMap<String, PeerState>>,
    rotation: AtomicUsize,
}

impl Pool {
    pub fn new(caller_name: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            caller_name: caller_name.into(),
            connect_timeout,
            peers: Mutex::new(HashMap::new()),
            rotation: AtomicUsize::new(0),
        }
    }

    /// Replaces the peer set; unknown addresses are added and missing ones
    /// dropped with their connections.
    pub fn set_peers(&self, addresses: &[String]) {
        let mut peers = self.peers.lock().expect("pool lock poisoned");
        peers.retain(|addr, _| addresses.iter().any(|a| a == addr));
        for address in addresses {
            peers.entry(address.clone()).or_default();
        }
    }

    pub fn add_peer(&self, address: &str) {
        self.peers
            .lock()
            .expect("pool lock poisoned")
            .entry(address.to_string())
            .or_default();
    }

    pub fn remove_peer(&self, address: &str) {
        self.peers.lock().expect("pool lock poisoned").remove(address);
    }

    pub fn peer_addresses(&self) -> Vec<String> {
        self.peers
            .lock()
            .expect("pool lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub async fn connected_count(&self) -> usize {
        let states: Vec<PeerState> = {
            let peers = self.peers.lock().expect("pool lock poisoned");
            peers.values().cloned().collect()
        };
        let mut count = 0;
        for state in states {
            if let Ok(slot) = state.try_lock() {
                if slot.is_some() {
                    count += 1;
                }
            } else {
                // Locked means a dial or call is in flight.
                count += 1;
            }
        }
        count
    }

    /// Opens probe connections until at least `min_peers` peers hold one,
    /// using `conn_check_timeout` per dial. Returns the connected count.
    pub async fn ensure_connections(
        &self,
        min_peers: usize,
        conn_check_timeout: Duration,
    ) -> usize {
        let entries: Vec<(String, PeerState)> = {
            let peers = self.peers.lock().expect("pool lock poisoned");
            peers
                .iter()
                .map(|(addr, state)| (addr.clone(), state.clone()))
                .collect()
        };
        let mut connected = 0;
        for (address, state) in entries {
            if connected >= min_peers {
                break;
            }
            let mut slot = state.lock().await;
            if slot.is_some() {
                connected += 1;
                continue;
            }
            match Connection::connect(&address, &self.caller_name, conn_check_timeout).await {
                Ok(connection) => {
                    *slot = Some(connection);
                    connected += 1;
                }
                Err(err) => {
                    tracing::debug!(peer = %address, error = %err, "peer probe failed");
                }
            }
        }
        connected
    }

    /// Places a call against one peer, dialing if necessary. A transport
    /// failure tears the connection down so the next call re-dials.
    pub async fn call(
        &self,
        service: &str,
        method: &str,
        arg3: Bytes,
        ttl: Duration,
    ) -> Result<Bytes, TchannelError> {
        let (address, state) = self.pick()?;
        let mut slot = state.lock().await;
        if slot.is_none() {
            *slot =
                Some(Connection::connect(&address, &self.caller_name, self.connect_timeout).await?);
        }
        let connection = slot.as_mut().expect("connection just established");
        match connection
            .call(service, &self.caller_name, method, arg3, ttl)
            .await
        {
            Ok(response) => Ok(response),
            Err(err) => {
                *slot = None;
                Err(err)
            }
        }
    }

    // Round-robin over the peer set, preferring peers with a ready
    // connection.
    fn pick(&self) -> Result<(String, PeerState), TchannelError> {
        let peers = self.peers.lock().expect("pool lock poisoned");
        if peers.is_empty() {
            return Err(TchannelError::NoPeers);
        }
        let mut entries: Vec<(&String, &PeerState)> = peers.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let offset = self.rotation.fetch_add(1, Ordering::Relaxed);

        let connected: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, (_, state))| {
                state
                    .try_lock()
                    .map(|slot| slot.is_some())
                    .unwrap_or(true)
            })
            .map(|(index, _)| index)
            .collect();

        let index = if connected.is_empty() {
            offset % entries.len()
        } else {
            connected[offset % connected.len()]
        };
        let (address, state) = entries[index];
        Ok((address.clone(), (*state).clone()))
    }
}
