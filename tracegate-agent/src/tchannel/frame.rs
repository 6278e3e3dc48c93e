//! Frame layout: every frame starts with a 16-byte header
//! `size:2 type:1 reserved:1 id:4 reserved:8`, `size` covering the header.

use super::TchannelError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

pub const FRAME_HEADER_LEN: usize = 16;
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;
/// Zeroed tracing block carried on every call frame.
pub const TRACING_LEN: usize = 25;

pub const TYPE_INIT_REQ: u8 = 0x01;
pub const TYPE_INIT_RES: u8 = 0x02;
pub const TYPE_CALL_REQ: u8 = 0x03;
pub const TYPE_CALL_RES: u8 = 0x04;
pub const TYPE_ERROR: u8 = 0xff;

pub const PROTOCOL_VERSION: u16 = 2;
pub const ARG_SCHEME_HEADER: &str = "as";
pub const CALLER_NAME_HEADER: &str = "cn";
pub const ARG_SCHEME_THRIFT: &str = "thrift";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: u8,
    pub id: u32,
    pub payload: Bytes,
}

#[derive(Debug, Default)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = TchannelError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, Self::Error> {
        if src.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }
        let size = u16::from_be_bytes([src[0], src[1]]) as usize;
        if size < FRAME_HEADER_LEN {
            return Err(TchannelError::Protocol(format!(
                "frame size {size} below header length"
            )));
        }
        if src.len() < size {
            src.reserve(size - src.len());
            return Ok(None);
        }
        let mut frame = src.split_to(size);
        frame.advance(2);
        let frame_type = frame.get_u8();
        frame.advance(1);
        let id = frame.get_u32();
        frame.advance(8);
        Ok(Some(Frame {
            frame_type,
            id,
            payload: frame.freeze(),
        }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = TchannelError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let size = FRAME_HEADER_LEN + frame.payload.len();
        if size > MAX_FRAME_LEN {
            return Err(TchannelError::FrameTooLarge(frame.payload.len()));
        }
        dst.reserve(size);
        dst.put_u16(size as u16);
        dst.put_u8(frame.frame_type);
        dst.put_u8(0);
        dst.put_u32(frame.id);
        dst.put_u64(0);
        dst.extend_from_slice(&frame.payload);
        Ok(())
    }
}

/// `init req` / `init res` payload: version plus name/value headers.
pub fn build_init_payload(headers: &[(&str, &str)]) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u16(PROTOCOL_VERSION);
    buf.put_u16(headers.len() as u16);
    for (key, value) in headers {
        put_len16_str(&mut buf, key);
        put_len16_str(&mut buf, value);
    }
    buf.freeze()
}

pub fn parse_init_payload(mut payload: Bytes) -> Result<Vec<(String, String)>, TchannelError> {
    let version = get_u16(&mut payload)?;
    if version != PROTOCOL_VERSION {
        return Err(TchannelError::Protocol(format!(
            "unsupported protocol version {version}"
        )));
    }
    let count = get_u16(&mut payload)?;
    let mut headers = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let key = get_len16_str(&mut payload)?;
        let value = get_len16_str(&mut payload)?;
        headers.push((key, value));
    }
    Ok(headers)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub ttl_millis: u32,
    pub service: String,
    pub headers: Vec<(String, String)>,
    pub arg1: Bytes,
    pub arg2: Bytes,
    pub arg3: Bytes,
}

pub fn build_call_req_payload(call: &CallRequest) -> Result<Bytes, TchannelError> {
    let mut buf = BytesMut::new();
    buf.put_u8(0); // flags: no fragments
    buf.put_u32(call.ttl_millis);
    buf.put_bytes(0, TRACING_LEN);
    put_len8_str(&mut buf, &call.service)?;
    buf.put_u8(call.headers.len() as u8);
    for (key, value) in &call.headers {
        put_len8_str(&mut buf, key)?;
        put_len8_str(&mut buf, value)?;
    }
    buf.put_u8(0); // csumtype: none
    for arg in [&call.arg1, &call.arg2, &call.arg3] {
        put_len16_bytes(&mut buf, arg)?;
    }
    Ok(buf.freeze())
}

pub fn parse_call_req_payload(mut payload: Bytes) -> Result<CallRequest, TchannelError> {
    let flags = get_u8(&mut payload)?;
    if flags != 0 {
        return Err(TchannelError::Protocol(
            "fragmented calls are not supported".to_string(),
        ));
    }
    let ttl_millis = get_u32(&mut payload)?;
    skip(&mut payload, TRACING_LEN)?;
    let service = get_len8_str(&mut payload)?;
    let header_count = get_u8(&mut payload)?;
    let mut headers = Vec::with_capacity(header_count as usize);
    for _ in 0..header_count {
        let key = get_len8_str(&mut payload)?;
        let value = get_len8_str(&mut payload)?;
        headers.push((key, value));
    }
    skip_checksum(&mut payload)?;
    let arg1 = get_len16_bytes(&mut payload)?;
    let arg2 = get_len16_bytes(&mut payload)?;
    let arg3 = get_len16_bytes(&mut payload)?;
    Ok(CallRequest {
        ttl_millis,
        service,
        headers,
        arg1,
        arg2,
        arg3,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResponse {
    /// 0 means ok, anything else is an application error.
    pub code: u8,
    pub headers: Vec<(String, String)>,
    pub arg1: Bytes,
    pub arg2: Bytes,
    pub arg3: Bytes,
}

pub fn build_call_res_payload(response: &CallResponse) -> Result<Bytes, TchannelError> {
    let mut buf = BytesMut::new();
    buf.put_u8(0);
    buf.put_u8(response.code);
    buf.put_bytes(0, TRACING_LEN);
    buf.put_u8(response.headers.len() as u8);
    for (key, value) in &response.headers {
        put_len8_str(&mut buf, key)?;
        put_len8_str(&mut buf, value)?;
    }
    buf.put_u8(0);
    for arg in [&response.arg1, &response.arg2, &response.arg3] {
        put_len16_bytes(&mut buf, arg)?;
    }
    Ok(buf.freeze())
}

pub fn parse_call_res_payload(mut payload: Bytes) -> Result<CallResponse, TchannelError> {
    let flags = get_u8(&mut payload)?;
    if flags != 0 {
        return Err(TchannelError::Protocol(
            "fragmented responses are not supported".to_string(),
        ));
    }
    let code = get_u8(&mut payload)?;
    skip(&mut payload, TRACING_LEN)?;
    let header_count = get_u8(&mut payload)?;
    let mut headers = Vec::with_capacity(header_count as usize);
    for _ in 0..header_count {
        let key = get_len8_str(&mut payload)?;
        let value = get_len8_str(&mut payload)?;
        headers.push((key, value));
    }
    skip_checksum(&mut payload)?;
    let arg1 = get_len16_bytes(&mut payload)?;
    let arg2 = get_len16_bytes(&mut payload)?;
    let arg3 = get_len16_bytes(&mut payload)?;
    Ok(CallResponse {
        code,
        headers,
        arg1,
        arg2,
        arg3,
    })
}

pub fn build_error_payload(code: u8, message: &str) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u8(code);
    buf.put_bytes(0, TRACING_LEN);
    put_len16_str(&mut buf, message);
    buf.freeze()
}

pub fn parse_error_payload(mut payload: Bytes) -> Result<(u8, String), TchannelError> {
    let code = get_u8(&mut payload)?;
    skip(&mut payload, TRACING_LEN)?;
    let message = get_len16_str(&mut payload)?;
    Ok((code, message))
}

fn put_len8_str(buf: &mut BytesMut, s: &str) -> Result<(), TchannelError> {
    let bytes = s.as_bytes();
    if bytes.len() > u8::MAX as usize {
        return Err(TchannelError::Protocol(format!(
            "string of {} bytes too long for ~1 field",
            bytes.len()
        )));
    }
    buf.put_u8(bytes.len() as u8);
    buf.extend_from_slice(bytes);
    Ok(())
}

fn put_len16_str(buf: &mut BytesMut, s: &str) {
    buf.put_u16(s.len() as u16);
    buf.extend_from_slice(s.as_bytes());
}

fn put_len16_bytes(buf: &mut BytesMut, bytes: &Bytes) -> Result<(), TchannelError> {
    if bytes.len() > u16::MAX as usize {
        return Err(TchannelError::FrameTooLarge(bytes.len()));
    }
    buf.put_u16(bytes.len() as u16);
    buf.extend_from_slice(bytes);
    Ok(())
}

fn get_u8(payload: &mut Bytes) -> Result<u8, TchannelError> {
    if payload.is_empty() {
        return Err(truncated());
    }
    Ok(payload.get_u8())
}

fn get_u16(payload: &mut Bytes) -> Result<u16, TchannelError> {
    if payload.len() < 2 {
        return Err(truncated());
    }
    Ok(payload.get_u16())
}

fn get_u32(payload: &mut Bytes) -> Result<u32, TchannelError> {
    if payload.len() < 4 {
        return Err(truncated());
    }
    Ok(payload.get_u32())
}

fn skip(payload: &mut Bytes, n: usize) -> Result<(), TchannelError> {
    if payload.len() < n {
        return Err(truncated());
    }
    payload.advance(n);
    Ok(())
}

fn skip_checksum(payload: &mut Bytes) -> Result<(), TchannelError> {
    let csum_type = get_u8(payload)?;
    if csum_type != 0 {
        skip(payload, 4)?;
    }
    Ok(())
}

fn get_len8_str(payload: &mut Bytes) -> Result<String, TchannelError> {
    let len = get_u8(payload)? as usize;
    get_str(payload, len)
}

fn get_len16_str(payload: &mut Bytes) -> Result<String, TchannelError> {
    let len = get_u16(payload)? as usize;
    get_str(payload, len)
}

fn get_len16_bytes(payload: &mut Bytes) -> Result<Bytes, TchannelError> {
    let len = get_u16(payload)? as usize;
    if payload.len() < len {
        return Err(truncated());
    }
    Ok(payload.split_to(len))
}

fn get_str(payload: &mut Bytes, len: usize) -> Result<String, TchannelError> {
    if payload.len() < len {
        return Err(truncated());
    }
    let bytes = payload.split_to(len);
    String::from_utf8(bytes.to_vec())
        .map_err(|_| TchannelError::Protocol("header is not utf-8".to_string()))
}

fn truncated() -> TchannelError {
    TchannelError::Protocol("truncated frame payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn frame_codec_round_trip() {
        let frame = Frame {
            frame_type: TYPE_CALL_REQ,
            id: 42,
            payload: Bytes::from_static(b"hello"),
        };
        let mut buf = BytesMut::new();
        FrameCodec.encode(frame.clone(), &mut buf).unwrap();
        assert_eq!(buf.len(), FRAME_HEADER_LEN + 5);
        let decoded = FrameCodec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert!(buf.is_empty());
    }

    #[test]
    fn decoder_waits_for_full_frame() {
        let frame = Frame {
            frame_type: TYPE_INIT_REQ,
            id: 1,
            payload: Bytes::from_static(b"abcdef"),
        };
        let mut encoded = BytesMut::new();
        FrameCodec.encode(frame.clone(), &mut encoded).unwrap();

        let mut partial = BytesMut::from(&encoded[..FRAME_HEADER_LEN + 2]);
        assert!(FrameCodec.decode(&mut partial).unwrap().is_none());
        partial.extend_from_slice(&encoded[FRAME_HEADER_LEN + 2..]);
        assert_eq!(FrameCodec.decode(&mut partial).unwrap().unwrap(), frame);
    }

    #[test]
    fn call_req_round_trip() {
        let call = CallRequest {
            ttl_millis: 1000,
            service: "trace-collector".to_string(),
            headers: vec![
                (ARG_SCHEME_HEADER.to_string(), ARG_SCHEME_THRIFT.to_string()),
                (CALLER_NAME_HEADER.to_string(), "tracegate-agent".to_string()),
            ],
            arg1: Bytes::from_static(b"Collector::submitBatches"),
            arg2: Bytes::new(),
            arg3: Bytes::from_static(b"\x01\x02\x03"),
        };
        let payload = build_call_req_payload(&call).unwrap();
        assert_eq!(parse_call_req_payload(payload).unwrap(), call);
    }

    #[test]
    fn call_res_round_trip() {
        let response = CallResponse {
            code: 0,
            headers: vec![],
            arg1: Bytes::new(),
            arg2: Bytes::new(),
            arg3: Bytes::from_static(b"result"),
        };
        let payload = build_call_res_payload(&response).unwrap();
        assert_eq!(parse_call_res_payload(payload).unwrap(), response);
    }

    #[test]
    fn init_and_error_round_trip() {
        let payload = build_init_payload(&[("host_port", "0.0.0.0:0"), ("process_name", "x")]);
        let headers = parse_init_payload(payload).unwrap();
        assert_eq!(headers[0].0, "host_port");

        let payload = build_error_payload(0x03, "busy");
        assert_eq!(parse_error_payload(payload).unwrap(), (3, "busy".to_string()));
    }
}
