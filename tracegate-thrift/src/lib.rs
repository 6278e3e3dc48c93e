//! Thrift wire structs for the UDP ingest formats and the framed-TCP
//! collector calls, written against the `thrift` crate's protocol traits.
//!
//! The structs mirror the jaeger / zipkin-core / sampling IDLs field by
//! field. They are maintained by hand instead of generated so the build has
//! no Thrift-compiler dependency; the read loops follow the usual
//! read-field-begin / match-id / skip-unknown shape.

pub mod agent;
pub mod calls;
pub mod convert;
pub mod jaeger;
pub mod sampling;
pub mod zipkin;

use thrift::protocol::{
    TBinaryInputProtocol, TCompactInputProtocol, TFieldIdentifier, TInputProtocol,
};

/// Thrift protocol variant spoken on a UDP port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Compact,
    Binary,
}

/// Malformed or truncated payload. Wraps the underlying protocol error so
/// callers can count and drop without inspecting further.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("thrift protocol error: {0}")]
    Thrift(#[from] thrift::Error),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

pub(crate) fn field_id(ident: &TFieldIdentifier) -> thrift::Result<i16> {
    ident.id.ok_or_else(|| {
        thrift::Error::Protocol(thrift::ProtocolError::new(
            thrift::ProtocolErrorKind::InvalidData,
            "field identifier without an id",
        ))
    })
}

pub(crate) fn protocol_error(message: impl Into<String>) -> thrift::Error {
    thrift::Error::Protocol(thrift::ProtocolError::new(
        thrift::ProtocolErrorKind::InvalidData,
        message.into(),
    ))
}

/// Runs `f` with an input protocol of the requested variant over `bytes`.
pub fn with_input_protocol<T>(
    bytes: &[u8],
    protocol: Protocol,
    f: impl FnOnce(&mut dyn TInputProtocol) -> thrift::Result<T>,
) -> thrift::Result<T> {
    let mut reader = bytes;
    match protocol {
        Protocol::Compact => f(&mut TCompactInputProtocol::new(&mut reader)),
        Protocol::Binary => f(&mut TBinaryInputProtocol::new(&mut reader, true)),
    }
}
