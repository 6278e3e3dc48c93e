use crate::metrics::FormatServerMetrics;
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct UdpServerConfig {
    pub addr: SocketAddr,
    /// Read buffer size; larger datagrams are truncated by the OS.
    pub max_packet_size: usize,
    /// Capacity of the queue towards the processor.
    pub queue_size: usize,
}

/// Reads one datagram at a time and publishes the raw bytes onto the
/// processor queue. The reader never blocks on a full queue: the datagram
/// is dropped and counted instead.
pub struct UdpServer {
    socket: UdpSocket,
    max_packet_size: usize,
    tx: mpsc::Sender<Bytes>,
    metrics: FormatServerMetrics,
}

impl UdpServer {
    pub async fn bind(
        config: &UdpServerConfig,
        tx: mpsc::Sender<Bytes>,
        metrics: FormatServerMetrics,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(config.addr).await?;
        tracing::info!(addr = %socket.local_addr()?, "udp server listening");
        Ok(Self {
            socket,
            max_packet_size: config.max_packet_size,
            tx,
            metrics,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Runs until shutdown. Dropping the returned sender side closes the
    /// processor queue, letting workers drain and exit.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut buf = BytesMut::with_capacity(self.max_packet_size);
        loop {
            buf.resize(self.max_packet_size, 0);
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => received,
            };
            match received {
                Ok((len, _peer)) => {
                    let payload = buf.split_to(len).freeze();
                    self.metrics.packet_size.observe(len as f64);
                    match self.tx.try_send(payload) {
                        Ok(()) => self.metrics.packets_processed.inc(),
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            self.metrics.packets_dropped.inc();
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    }
                }
                Err(err) => {
                    self.metrics.read_errors.inc();
                    tracing::error!(error = %err, "udp read failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ServerMetrics;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    async fn start_server(
        queue_size: usize,
    ) -> (SocketAddr, mpsc::Receiver<Bytes>, FormatServerMetrics, CancellationToken) {
        let registry = prometheus::Registry::new();
        let metrics = ServerMetrics::new(&registry).unwrap().for_format("jaeger");
        let (tx, rx) = mpsc::channel(queue_size);
        let config = UdpServerConfig {
            addr: SocketAddr::from_str("127.0.0.1:0").unwrap(),
            max_packet_size: 65_000,
            queue_size,
        };
        let server = UdpServer::bind(&config, tx, metrics.clone()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let run_shutdown = shutdown.clone();
        tokio::spawn(async move { server.run(run_shutdown).await });
        (addr, rx, metrics, shutdown)
    }

    #[tokio::test]
    async fn forwards_datagrams_to_the_queue() {
        let (addr, mut rx, metrics, shutdown) = start_server(10).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"payload", addr).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(&received[..], b"payload");
        assert_eq!(metrics.packets_processed.get(), 1);
        assert_eq!(metrics.packets_dropped.get(), 0);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let (addr, mut rx, metrics, shutdown) = start_server(1).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        for _ in 0..20 {
            client.send_to(b"x", addr).await.unwrap();
        }
        // Give the reader time to work through the datagrams.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        assert!(metrics.packets_dropped.get() > 0);
        assert!(rx.recv().await.is_some());
        shutdown.cancel();
    }
}
