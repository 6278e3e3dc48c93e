//! Minimal client implementation of the TChannel v2 framing protocol, just
//! enough to place thrift-arg-scheme calls against a collector: init
//! handshake, single-frame `call req`/`call res`, and an error frame. No
//! continuation frames and no checksums — payloads originate from MTU-sized
//! datagrams and always fit one frame.

pub mod frame;

mod connection;
mod pool;

pub use connection::Connection;
pub use pool::Pool;

#[derive(Debug, thiserror::Error)]
pub enum TchannelError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("remote error code {code}: {message}")]
    Remote { code: u8, message: String },
    #[error("call failed with response code {0}")]
    CallFailed(u8),
    #[error("no peers available")]
    NoPeers,
    #[error("frame payload of {0} bytes exceeds the single-frame limit")]
    FrameTooLarge(usize),
}
