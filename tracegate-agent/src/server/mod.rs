//! Datagram ingest: one UDP server per wire format feeding a bounded queue,
//! drained by a fixed pool of processor workers.

mod processor;
mod udp;

pub use processor::{ThriftProcessor, WireFormat};
pub use udp::{UdpServer, UdpServerConfig};
