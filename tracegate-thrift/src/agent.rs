//! One-way message framing for the UDP ingest ports. Each datagram holds a
//! complete Thrift message: `emitBatch` carrying one jaeger batch, or
//! `emitZipkinBatch` carrying a list of zipkin spans.

use crate::{field_id, jaeger, protocol_error, with_input_protocol, zipkin, DecodeError, Protocol};
use thrift::protocol::{
    TBinaryOutputProtocol, TCompactOutputProtocol, TFieldIdentifier, TInputProtocol,
    TMessageIdentifier, TMessageType, TOutputProtocol, TType,
};

pub const EMIT_BATCH: &str = "emitBatch";
pub const EMIT_ZIPKIN_BATCH: &str = "emitZipkinBatch";

pub fn decode_emit_batch(bytes: &[u8], protocol: Protocol) -> Result<jaeger::Batch, DecodeError> {
    let batch = with_input_protocol(bytes, protocol, |i_prot| {
        let ident = i_prot.read_message_begin()?;
        if ident.name != EMIT_BATCH {
            return Err(protocol_error(format!(
                "unexpected message '{}', want '{EMIT_BATCH}'",
                ident.name
            )));
        }
        let batch = read_single_field_args(i_prot, |i_prot| jaeger::Batch::read(i_prot))?
            .ok_or_else(|| protocol_error("emitBatch without a batch argument"))?;
        i_prot.read_message_end()?;
        Ok(batch)
    })?;
    Ok(batch)
}

pub fn decode_emit_zipkin_batch(
    bytes: &[u8],
    protocol: Protocol,
) -> Result<Vec<zipkin::Span>, DecodeError> {
    let spans = with_input_protocol(bytes, protocol, |i_prot| {
        let ident = i_prot.read_message_begin()?;
        if ident.name != EMIT_ZIPKIN_BATCH {
            return Err(protocol_error(format!(
                "unexpected message '{}', want '{EMIT_ZIPKIN_BATCH}'",
                ident.name
            )));
        }
        let spans = read_single_field_args(i_prot, |i_prot| {
            jaeger::read_struct_list(i_prot, zipkin::Span::read)
        })?
        .unwrap_or_default();
        i_prot.read_message_end()?;
        Ok(spans)
    })?;
    Ok(spans)
}

pub fn encode_emit_batch(batch: &jaeger::Batch, protocol: Protocol) -> thrift::Result<Vec<u8>> {
    encode_oneway(protocol, EMIT_BATCH, |o_prot| {
        o_prot.write_field_begin(&TFieldIdentifier::new("batch", TType::Struct, 1))?;
        batch.write(o_prot)?;
        o_prot.write_field_end()
    })
}

pub fn encode_emit_zipkin_batch(
    spans: &[zipkin::Span],
    protocol: Protocol,
) -> thrift::Result<Vec<u8>> {
    encode_oneway(protocol, EMIT_ZIPKIN_BATCH, |o_prot| {
        o_prot.write_field_begin(&TFieldIdentifier::new("spans", TType::List, 1))?;
        jaeger::write_struct_list(o_prot, spans, zipkin::Span::write)?;
        o_prot.write_field_end()
    })
}

/// Reads the args struct of a one-field call, returning `None` when the
/// field is absent.
fn read_single_field_args<T>(
    i_prot: &mut dyn TInputProtocol,
    read_value: impl Fn(&mut dyn TInputProtocol) -> thrift::Result<T>,
) -> thrift::Result<Option<T>> {
    let mut value = None;
    i_prot.read_struct_begin()?;
    loop {
        let field = i_prot.read_field_begin()?;
        if field.field_type == TType::Stop {
            break;
        }
        match field_id(&field)? {
            1 => value = Some(read_value(i_prot)?),
            _ => i_prot.skip(field.field_type)?,
        }
        i_prot.read_field_end()?;
    }
    i_prot.read_struct_end()?;
    Ok(value)
}

fn encode_oneway(
    protocol: Protocol,
    name: &str,
    write_args: impl Fn(&mut dyn TOutputProtocol) -> thrift::Result<()>,
) -> thrift::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let write_all = |o_prot: &mut dyn TOutputProtocol| -> thrift::Result<()> {
        o_prot.write_message_begin(&TMessageIdentifier::new(name, TMessageType::OneWay, 0))?;
        o_prot.write_struct_begin(&thrift::protocol::TStructIdentifier::new(format!(
            "{name}_args"
        )))?;
        write_args(o_prot)?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()?;
        o_prot.write_message_end()?;
        o_prot.flush()
    };
    match protocol {
        Protocol::Compact => write_all(&mut TCompactOutputProtocol::new(&mut buf))?,
        Protocol::Binary => write_all(&mut TBinaryOutputProtocol::new(&mut buf, true))?,
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn emit_batch_round_trip_both_protocols() {
        let batch = jaeger::Batch::new(
            jaeger::Process::new("svc"),
            vec![jaeger::Span {
                operation_name: "span1".to_string(),
                trace_id_low: 1,
                span_id: 2,
                start_time: 10,
                duration: 5,
                ..Default::default()
            }],
        );
        for protocol in [Protocol::Compact, Protocol::Binary] {
            let bytes = encode_emit_batch(&batch, protocol).unwrap();
            let decoded = decode_emit_batch(&bytes, protocol).unwrap();
            assert_eq!(decoded, batch);
        }
    }

    #[test]
    fn zipkin_round_trip() {
        let spans = vec![zipkin::Span {
            trace_id: 1,
            name: "op".to_string(),
            id: 2,
            ..Default::default()
        }];
        let bytes = encode_emit_zipkin_batch(&spans, Protocol::Compact).unwrap();
        assert_eq!(
            decode_emit_zipkin_batch(&bytes, Protocol::Compact).unwrap(),
            spans
        );
    }

    #[test]
    fn wrong_message_name_is_rejected() {
        let spans = vec![zipkin::Span::default()];
        let bytes = encode_emit_zipkin_batch(&spans, Protocol::Compact).unwrap();
        assert!(decode_emit_batch(&bytes, Protocol::Compact).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_emit_batch(&[0xff, 0x00, 0x13], Protocol::Compact).is_err());
        assert!(decode_emit_batch(&[], Protocol::Binary).is_err());
    }
}
