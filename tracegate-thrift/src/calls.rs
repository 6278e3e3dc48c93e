//! Argument and result payloads for the calls the agent places over the
//! framed TCP transport. The arg scheme carries a bare struct (no message
//! envelope) encoded with the binary protocol; results use field id 0 for
//! the success value.

use crate::{field_id, jaeger, sampling, zipkin};
use thrift::protocol::{
    TBinaryInputProtocol, TBinaryOutputProtocol, TFieldIdentifier, TInputProtocol,
    TOutputProtocol, TStructIdentifier, TType,
};

pub const SUBMIT_BATCHES: &str = "Collector::submitBatches";
pub const SUBMIT_ZIPKIN_BATCH: &str = "ZipkinCollector::submitZipkinBatch";
pub const GET_SAMPLING_STRATEGY: &str = "SamplingManager::getSamplingStrategy";
pub const GET_BAGGAGE_RESTRICTIONS: &str = "BaggageRestrictionManager::getBaggageRestrictions";

fn encode_struct(
    name: &str,
    write_fields: impl FnOnce(&mut dyn TOutputProtocol) -> thrift::Result<()>,
) -> thrift::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut o_prot = TBinaryOutputProtocol::new(&mut buf, false);
    o_prot.write_struct_begin(&TStructIdentifier::new(name))?;
    write_fields(&mut o_prot)?;
    o_prot.write_field_stop()?;
    o_prot.write_struct_end()?;
    o_prot.flush()?;
    drop(o_prot);
    Ok(buf)
}

fn decode_struct<T: Default>(
    bytes: &[u8],
    mut on_field: impl FnMut(&mut dyn TInputProtocol, i16, TType, &mut T) -> thrift::Result<bool>,
) -> thrift::Result<T> {
    let mut reader = bytes;
    let mut i_prot = TBinaryInputProtocol::new(&mut reader, false);
    let mut out = T::default();
    i_prot.read_struct_begin()?;
    loop {
        let field = i_prot.read_field_begin()?;
        if field.field_type == TType::Stop {
            break;
        }
        let id = field_id(&field)?;
        if !on_field(&mut i_prot, id, field.field_type, &mut out)? {
            i_prot.skip(field.field_type)?;
        }
        i_prot.read_field_end()?;
    }
    i_prot.read_struct_end()?;
    Ok(out)
}

pub fn encode_submit_batches_args(batches: &[jaeger::Batch]) -> thrift::Result<Vec<u8>> {
    encode_struct("submitBatches_args", |o_prot| {
        o_prot.write_field_begin(&TFieldIdentifier::new("batches", TType::List, 1))?;
        jaeger::write_struct_list(o_prot, batches, jaeger::Batch::write)?;
        o_prot.write_field_end()
    })
}

pub fn decode_submit_batches_args(bytes: &[u8]) -> thrift::Result<Vec<jaeger::Batch>> {
    decode_struct(bytes, |i_prot, id, _, out: &mut Vec<jaeger::Batch>| {
        if id == 1 {
            *out = jaeger::read_struct_list(i_prot, jaeger::Batch::read)?;
            Ok(true)
        } else {
            Ok(false)
        }
    })
}

pub fn encode_submit_batches_result(
    responses: &[jaeger::BatchSubmitResponse],
) -> thrift::Result<Vec<u8>> {
    encode_struct("submitBatches_result", |o_prot| {
        o_prot.write_field_begin(&TFieldIdentifier::new("success", TType::List, 0))?;
        jaeger::write_struct_list(o_prot, responses, jaeger::BatchSubmitResponse::write)?;
        o_prot.write_field_end()
    })
}

pub fn decode_submit_batches_result(
    bytes: &[u8],
) -> thrift::Result<Vec<jaeger::BatchSubmitResponse>> {
    decode_struct(
        bytes,
        |i_prot, id, _, out: &mut Vec<jaeger::BatchSubmitResponse>| {
            if id == 0 {
                *out = jaeger::read_struct_list(i_prot, jaeger::BatchSubmitResponse::read)?;
                Ok(true)
            } else {
                Ok(false)
            }
        },
    )
}

pub fn encode_submit_zipkin_batch_args(spans: &[zipkin::Span]) -> thrift::Result<Vec<u8>> {
    encode_struct("submitZipkinBatch_args", |o_prot| {
        o_prot.write_field_begin(&TFieldIdentifier::new("spans", TType::List, 1))?;
        jaeger::write_struct_list(o_prot, spans, zipkin::Span::write)?;
        o_prot.write_field_end()
    })
}

pub fn decode_submit_zipkin_batch_args(bytes: &[u8]) -> thrift::Result<Vec<zipkin::Span>> {
    decode_struct(bytes, |i_prot, id, _, out: &mut Vec<zipkin::Span>| {
        if id == 1 {
            *out = jaeger::read_struct_list(i_prot, zipkin::Span::read)?;
            Ok(true)
        } else {
            Ok(false)
        }
    })
}

pub fn encode_submit_zipkin_batch_result(
    responses: &[zipkin::Response],
) -> thrift::Result<Vec<u8>> {
    encode_struct("submitZipkinBatch_result", |o_prot| {
        o_prot.write_field_begin(&TFieldIdentifier::new("success", TType::List, 0))?;
        jaeger::write_struct_list(o_prot, responses, zipkin::Response::write)?;
        o_prot.write_field_end()
    })
}

pub fn decode_submit_zipkin_batch_result(bytes: &[u8]) -> thrift::Result<Vec<zipkin::Response>> {
    decode_struct(bytes, |i_prot, id, _, out: &mut Vec<zipkin::Response>| {
        if id == 0 {
            *out = jaeger::read_struct_list(i_prot, zipkin::Response::read)?;
            Ok(true)
        } else {
            Ok(false)
        }
    })
}

pub fn encode_get_sampling_strategy_args(service_name: &str) -> thrift::Result<Vec<u8>> {
    encode_struct("getSamplingStrategy_args", |o_prot| {
        o_prot.write_field_begin(&TFieldIdentifier::new("serviceName", TType::String, 1))?;
        o_prot.write_string(service_name)?;
        o_prot.write_field_end()
    })
}

pub fn decode_get_sampling_strategy_args(bytes: &[u8]) -> thrift::Result<String> {
    decode_struct(bytes, |i_prot, id, _, out: &mut String| {
        if id == 1 {
            *out = i_prot.read_string()?;
            Ok(true)
        } else {
            Ok(false)
        }
    })
}

pub fn encode_get_sampling_strategy_result(
    response: &sampling::SamplingStrategyResponse,
) -> thrift::Result<Vec<u8>> {
    encode_struct("getSamplingStrategy_result", |o_prot| {
        o_prot.write_field_begin(&TFieldIdentifier::new("success", TType::Struct, 0))?;
        response.write(o_prot)?;
        o_prot.write_field_end()
    })
}

pub fn decode_get_sampling_strategy_result(
    bytes: &[u8],
) -> thrift::Result<sampling::SamplingStrategyResponse> {
    decode_struct(
        bytes,
        |i_prot, id, _, out: &mut sampling::SamplingStrategyResponse| {
            if id == 0 {
                *out = sampling::SamplingStrategyResponse::read(i_prot)?;
                Ok(true)
            } else {
                Ok(false)
            }
        },
    )
}

pub fn encode_get_baggage_restrictions_args(service_name: &str) -> thrift::Result<Vec<u8>> {
    encode_struct("getBaggageRestrictions_args", |o_prot| {
        o_prot.write_field_begin(&TFieldIdentifier::new("serviceName", TType::String, 1))?;
        o_prot.write_string(service_name)?;
        o_prot.write_field_end()
    })
}

pub fn decode_get_baggage_restrictions_result(
    bytes: &[u8],
) -> thrift::Result<Vec<sampling::BaggageRestriction>> {
    decode_struct(
        bytes,
        |i_prot, id, _, out: &mut Vec<sampling::BaggageRestriction>| {
            if id == 0 {
                *out = jaeger::read_struct_list(i_prot, sampling::BaggageRestriction::read)?;
                Ok(true)
            } else {
                Ok(false)
            }
        },
    )
}

pub fn encode_get_baggage_restrictions_result(
    restrictions: &[sampling::BaggageRestriction],
) -> thrift::Result<Vec<u8>> {
    encode_struct("getBaggageRestrictions_result", |o_prot| {
        o_prot.write_field_begin(&TFieldIdentifier::new("success", TType::List, 0))?;
        jaeger::write_struct_list(o_prot, restrictions, sampling::BaggageRestriction::write)?;
        o_prot.write_field_end()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn submit_batches_args_round_trip() {
        let batches = vec![jaeger::Batch::new(
            jaeger::Process::new("svc"),
            vec![jaeger::Span {
                operation_name: "op".to_string(),
                ..Default::default()
            }],
        )];
        let bytes = encode_submit_batches_args(&batches).unwrap();
        assert_eq!(decode_submit_batches_args(&bytes).unwrap(), batches);
    }

    #[test]
    fn result_round_trips() {
        let responses = vec![jaeger::BatchSubmitResponse { ok: true }];
        let bytes = encode_submit_batches_result(&responses).unwrap();
        assert_eq!(decode_submit_batches_result(&bytes).unwrap(), responses);

        let strategy = sampling::SamplingStrategyResponse {
            strategy_type: sampling::STRATEGY_TYPE_PROBABILISTIC,
            probabilistic_sampling: Some(sampling::ProbabilisticSamplingStrategy {
                sampling_rate: 0.5,
            }),
            ..Default::default()
        };
        let bytes = encode_get_sampling_strategy_result(&strategy).unwrap();
        assert_eq!(
            decode_get_sampling_strategy_result(&bytes).unwrap(),
            strategy
        );
    }

    #[test]
    fn sampling_args_round_trip() {
        let bytes = encode_get_sampling_strategy_args("frontend").unwrap();
        assert_eq!(
            decode_get_sampling_strategy_args(&bytes).unwrap(),
            "frontend"
        );
    }
}
