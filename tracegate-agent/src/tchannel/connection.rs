use super::frame::{
    self, CallRequest, Frame, FrameCodec, TYPE_CALL_RES, TYPE_ERROR, TYPE_INIT_REQ, TYPE_INIT_RES,
};
use super::TchannelError;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

/// One framed TCP connection to a peer, handshaken and ready for calls.
/// A connection handles one call at a time; the [`super::Pool`] provides
/// concurrency across peers.
pub struct Connection {
    framed: Framed<TcpStream, FrameCodec>,
    next_id: u32,
    peer: String,
}

impl Connection {
    pub async fn connect(
        peer: &str,
        caller_name: &str,
        timeout: Duration,
    ) -> Result<Self, TchannelError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(peer))
            .await
            .map_err(|_| TchannelError::Timeout(timeout))??;
        let mut framed = Framed::new(stream, FrameCodec);

        let init = Frame {
            frame_type: TYPE_INIT_REQ,
            id: 1,
            payload: frame::build_init_payload(&[
                ("host_port", "0.0.0.0:0"),
                ("process_name", caller_name),
            ]),
        };
        tokio::time::timeout(timeout, framed.send(init))
            .await
            .map_err(|_| TchannelError::Timeout(timeout))??;

        let response = tokio::time::timeout(timeout, framed.next())
            .await
            .map_err(|_| TchannelError::Timeout(timeout))?
            .ok_or_else(|| {
                TchannelError::Protocol("connection closed during handshake".to_string())
            })??;
        if response.frame_type != TYPE_INIT_RES {
            return Err(TchannelError::Protocol(format!(
                "expected init res, got frame type {:#x}",
                response.frame_type
            )));
        }
        frame::parse_init_payload(response.payload)?;

        tracing::debug!(peer, "tchannel connection established");
        Ok(Self {
            framed,
            next_id: 2,
            peer: peer.to_string(),
        })
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Places a thrift-arg-scheme call and waits for the matching response
    /// within `ttl`.
    pub async fn call(
        &mut self,
        service: &str,
        caller_name: &str,
        method: &str,
        arg3: Bytes,
        ttl: Duration,
    ) -> Result<Bytes, TchannelError> {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(2);

        let request = Frame {
            frame_type: frame::TYPE_CALL_REQ,
            id,
            payload: frame::build_call_req_payload(&CallRequest {
                ttl_millis: ttl.as_millis() as u32,
                service: service.to_string(),
                headers: vec![
                    (
                        frame::ARG_SCHEME_HEADER.to_string(),
                        frame::ARG_SCHEME_THRIFT.to_string(),
                    ),
                    (frame::CALLER_NAME_HEADER.to_string(), caller_name.to_string()),
                ],
                arg1: Bytes::copy_from_slice(method.as_bytes()),
                arg2: Bytes::new(),
                arg3,
            })?,
        };

        tokio::time::timeout(ttl, self.framed.send(request))
            .await
            .map_err(|_| TchannelError::Timeout(ttl))??;

        loop {
            let response = tokio::time::timeout(ttl, self.framed.next())
                .await
                .map_err(|_| TchannelError::Timeout(ttl))?
                .ok_or_else(|| {
                    TchannelError::Protocol("connection closed awaiting response".to_string())
                })??;
            match response.frame_type {
                TYPE_CALL_RES if response.id == id => {
                    let parsed = frame::parse_call_res_payload(response.payload)?;
                    if parsed.code != 0 {
                        return Err(TchannelError::CallFailed(parsed.code));
                    }
                    return Ok(parsed.arg3);
                }
                TYPE_ERROR => {
                    let (code, message) = frame::parse_error_payload(response.payload)?;
                    return Err(TchannelError::Remote { code, message });
                }
                // Stale response for an abandoned call; keep waiting.
                TYPE_CALL_RES => continue,
                other => {
                    return Err(TchannelError::Protocol(format!(
                        "unexpected frame type {other:#x}"
                    )))
                }
            }
        }
    }
}
