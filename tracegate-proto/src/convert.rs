//! Conversions between the domain model and the `jaeger.api_v2` messages.

use crate::jaeger::api_v2 as proto;
use tracegate_model::{
    strategy, Batch, Flags, InvalidId, KeyValue, Log, Process, RefType, Span, SpanId, SpanRef,
    TagValue, TraceId,
};

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("invalid id bytes: {0}")]
    Id(#[from] InvalidId),
    #[error("unknown enum value {value} for {what}")]
    Enum { what: &'static str, value: i32 },
}

const MICROS_PER_SEC: u64 = 1_000_000;

// String slots arrive as raw bytes so invalid UTF-8 cannot fail the
// request; bad names decode to replacement characters and the sanitizers
// substitute their placeholders downstream.
fn lossy_string(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

fn timestamp_from_micros(micros: u64) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: (micros / MICROS_PER_SEC) as i64,
        nanos: ((micros % MICROS_PER_SEC) * 1_000) as i32,
    }
}

fn micros_from_timestamp(ts: &prost_types::Timestamp) -> u64 {
    let seconds = ts.seconds.max(0) as u64;
    let nanos = ts.nanos.max(0) as u64;
    seconds * MICROS_PER_SEC + nanos / 1_000
}

fn duration_from_micros(micros: u64) -> prost_types::Duration {
    prost_types::Duration {
        seconds: (micros / MICROS_PER_SEC) as i64,
        nanos: ((micros % MICROS_PER_SEC) * 1_000) as i32,
    }
}

fn micros_from_duration(duration: &prost_types::Duration) -> u64 {
    let seconds = duration.seconds.max(0) as u64;
    let nanos = duration.nanos.max(0) as u64;
    seconds * MICROS_PER_SEC + nanos / 1_000
}

pub fn key_value_to_proto(kv: &KeyValue) -> proto::KeyValue {
    let mut out = proto::KeyValue {
        key: kv.key.clone(),
        ..Default::default()
    };
    match &kv.value {
        TagValue::String(s) => {
            out.v_type = proto::ValueType::String as i32;
            out.v_str = s.clone().into_bytes();
        }
        TagValue::Bool(b) => {
            out.v_type = proto::ValueType::Bool as i32;
            out.v_bool = *b;
        }
        TagValue::Int64(i) => {
            out.v_type = proto::ValueType::Int64 as i32;
            out.v_int64 = *i;
        }
        TagValue::Float64(f) => {
            out.v_type = proto::ValueType::Float64 as i32;
            out.v_float64 = *f;
        }
        TagValue::Binary(b) => {
            out.v_type = proto::ValueType::Binary as i32;
            out.v_binary = b.clone();
        }
    }
    out
}

pub fn key_value_to_domain(kv: proto::KeyValue) -> Result<KeyValue, ConvertError> {
    let v_type = proto::ValueType::try_from(kv.v_type).map_err(|_| ConvertError::Enum {
        what: "ValueType",
        value: kv.v_type,
    })?;
    let value = match v_type {
        // A string value that is not valid UTF-8 is carried through as
        // binary so the sanitizer can rewrite it to its keyed form with
        // the raw bytes intact.
        proto::ValueType::String => match String::from_utf8(kv.v_str) {
            Ok(text) => TagValue::String(text),
            Err(err) => TagValue::Binary(err.into_bytes()),
        },
        proto::ValueType::Bool => TagValue::Bool(kv.v_bool),
        proto::ValueType::Int64 => TagValue::Int64(kv.v_int64),
        proto::ValueType::Float64 => TagValue::Float64(kv.v_float64),
        proto::ValueType::Binary => TagValue::Binary(kv.v_binary),
    };
    Ok(KeyValue { key: kv.key, value })
}

pub fn process_to_proto(process: &Process) -> proto::Process {
    proto::Process {
        service_name: process.service_name.clone().into_bytes(),
        tags: process.tags.iter().map(key_value_to_proto).collect(),
    }
}

pub fn process_to_domain(process: proto::Process) -> Result<Process, ConvertError> {
    Ok(Process {
        service_name: lossy_string(process.service_name),
        tags: process
            .tags
            .into_iter()
            .map(key_value_to_domain)
            .collect::<Result<_, _>>()?,
    })
}

pub fn span_to_proto(span: &Span) -> proto::Span {
    proto::Span {
        trace_id: span.trace_id.to_bytes().to_vec(),
        span_id: span.span_id.to_bytes().to_vec(),
        operation_name: span.operation_name.clone().into_bytes(),
        references: span
            .references
            .iter()
            .map(|r| proto::SpanRef {
                trace_id: r.trace_id.to_bytes().to_vec(),
                span_id: r.span_id.to_bytes().to_vec(),
                ref_type: match r.ref_type {
                    RefType::ChildOf => proto::SpanRefType::ChildOf as i32,
                    RefType::FollowsFrom => proto::SpanRefType::FollowsFrom as i32,
                },
            })
            .chain(span.parent_span_id.map(|parent| proto::SpanRef {
                trace_id: span.trace_id.to_bytes().to_vec(),
                span_id: parent.to_bytes().to_vec(),
                ref_type: proto::SpanRefType::ChildOf as i32,
            }))
            .collect(),
        flags: span.flags.0,
        start_time: Some(timestamp_from_micros(span.start_time)),
        duration: Some(duration_from_micros(span.duration)),
        tags: span.tags.iter().map(key_value_to_proto).collect(),
        logs: span
            .logs
            .iter()
            .map(|log| proto::Log {
                timestamp: Some(timestamp_from_micros(log.timestamp)),
                fields: log.fields.iter().map(key_value_to_proto).collect(),
            })
            .collect(),
        process: span.process.as_ref().map(process_to_proto),
        process_id: String::new(),
        warnings: span.warnings.clone(),
    }
}

pub fn span_to_domain(span: proto::Span) -> Result<Span, ConvertError> {
    let trace_id = TraceId::from_bytes(&span.trace_id)?;
    let mut parent_span_id = None;
    let mut references = Vec::with_capacity(span.references.len());
    for (index, r) in span.references.into_iter().enumerate() {
        let ref_type = proto::SpanRefType::try_from(r.ref_type).map_err(|_| {
            ConvertError::Enum {
                what: "SpanRefType",
                value: r.ref_type,
            }
        })?;
        let reference = SpanRef {
            ref_type: match ref_type {
                proto::SpanRefType::ChildOf => RefType::ChildOf,
                proto::SpanRefType::FollowsFrom => RefType::FollowsFrom,
            },
            trace_id: TraceId::from_bytes(&r.trace_id)?,
            span_id: SpanId::from_bytes(&r.span_id)?,
        };
        // The first child-of reference within the same trace doubles as the
        // parent pointer.
        if index == 0
            && reference.ref_type == RefType::ChildOf
            && reference.trace_id == trace_id
            && parent_span_id.is_none()
        {
            parent_span_id = Some(reference.span_id);
        }
        references.push(reference);
    }
    Ok(Span {
        trace_id,
        span_id: SpanId::from_bytes(&span.span_id)?,
        parent_span_id,
        operation_name: lossy_string(span.operation_name),
        references,
        flags: Flags(span.flags),
        start_time: span
            .start_time
            .as_ref()
            .map(micros_from_timestamp)
            .unwrap_or_default(),
        duration: span
            .duration
            .as_ref()
            .map(micros_from_duration)
            .unwrap_or_default(),
        tags: span
            .tags
            .into_iter()
            .map(key_value_to_domain)
            .collect::<Result<_, _>>()?,
        logs: span
            .logs
            .into_iter()
            .map(|log| {
                Ok(Log {
                    timestamp: log
                        .timestamp
                        .as_ref()
                        .map(micros_from_timestamp)
                        .unwrap_or_default(),
                    fields: log
                        .fields
                        .into_iter()
                        .map(key_value_to_domain)
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect::<Result<Vec<_>, ConvertError>>()?,
        process: span.process.map(process_to_domain).transpose()?,
        warnings: span.warnings,
    })
}

pub fn batch_to_proto(batch: &Batch) -> proto::Batch {
    proto::Batch {
        spans: batch.spans.iter().map(span_to_proto).collect(),
        process: Some(process_to_proto(&batch.process)),
    }
}

pub fn batch_to_domain(batch: proto::Batch) -> Result<Batch, ConvertError> {
    Ok(Batch {
        process: batch
            .process
            .map(process_to_domain)
            .transpose()?
            .unwrap_or_default(),
        spans: batch
            .spans
            .into_iter()
            .map(span_to_domain)
            .collect::<Result<_, _>>()?,
        seq_no: None,
        stats: None,
    })
}

pub fn strategy_to_proto(
    domain: &strategy::SamplingStrategyResponse,
) -> proto::SamplingStrategyResponse {
    proto::SamplingStrategyResponse {
        strategy_type: match domain.strategy_type {
            strategy::SamplingStrategyType::Probabilistic => {
                proto::SamplingStrategyType::Probabilistic as i32
            }
            strategy::SamplingStrategyType::RateLimiting => {
                proto::SamplingStrategyType::RateLimiting as i32
            }
        },
        probabilistic_sampling: domain.probabilistic_sampling.map(|p| {
            proto::ProbabilisticSamplingStrategy {
                sampling_rate: p.sampling_rate,
            }
        }),
        rate_limiting_sampling: domain.rate_limiting_sampling.map(|r| {
            proto::RateLimitingSamplingStrategy {
                max_traces_per_second: r.max_traces_per_second,
            }
        }),
        operation_sampling: domain.operation_sampling.as_ref().map(|o| {
            proto::PerOperationSamplingStrategies {
                default_sampling_probability: o.default_sampling_probability,
                default_lower_bound_traces_per_second: o.default_lower_bound_traces_per_second,
                per_operation_strategies: o
                    .per_operation_strategies
                    .iter()
                    .map(|s| proto::OperationSamplingStrategy {
                        operation: s.operation.clone(),
                        probabilistic_sampling: Some(proto::ProbabilisticSamplingStrategy {
                            sampling_rate: s.probabilistic_sampling.sampling_rate,
                        }),
                    })
                    .collect(),
                default_upper_bound_traces_per_second: o
                    .default_upper_bound_traces_per_second
                    .unwrap_or_default(),
            }
        }),
    }
}

/// Lifts a proto strategy into the domain model. Unknown strategy types
/// collapse to `Probabilistic{0}` the way clients treat them.
pub fn strategy_to_domain(
    response: proto::SamplingStrategyResponse,
) -> strategy::SamplingStrategyResponse {
    let strategy_type = match proto::SamplingStrategyType::try_from(response.strategy_type) {
        Ok(proto::SamplingStrategyType::RateLimiting) => {
            strategy::SamplingStrategyType::RateLimiting
        }
        _ => strategy::SamplingStrategyType::Probabilistic,
    };
    let mut probabilistic_sampling =
        response
            .probabilistic_sampling
            .map(|p| strategy::ProbabilisticSamplingStrategy {
                sampling_rate: p.sampling_rate,
            });
    if strategy_type == strategy::SamplingStrategyType::Probabilistic
        && probabilistic_sampling.is_none()
    {
        probabilistic_sampling =
            Some(strategy::ProbabilisticSamplingStrategy { sampling_rate: 0.0 });
    }
    strategy::SamplingStrategyResponse {
        strategy_type,
        probabilistic_sampling,
        rate_limiting_sampling: response.rate_limiting_sampling.map(|r| {
            strategy::RateLimitingSamplingStrategy {
                max_traces_per_second: r.max_traces_per_second,
            }
        }),
        operation_sampling: response.operation_sampling.map(|o| {
            strategy::PerOperationSamplingStrategies {
                default_sampling_probability: o.default_sampling_probability,
                default_lower_bound_traces_per_second: o.default_lower_bound_traces_per_second,
                per_operation_strategies: o
                    .per_operation_strategies
                    .into_iter()
                    .map(|s| strategy::OperationSamplingStrategy {
                        operation: s.operation,
                        probabilistic_sampling: s
                            .probabilistic_sampling
                            .map(|p| strategy::ProbabilisticSamplingStrategy {
                                sampling_rate: p.sampling_rate,
                            })
                            .unwrap_or(strategy::ProbabilisticSamplingStrategy {
                                sampling_rate: 0.0,
                            }),
                    })
                    .collect(),
                default_upper_bound_traces_per_second: (o.default_upper_bound_traces_per_second
                    != 0.0)
                    .then_some(o.default_upper_bound_traces_per_second),
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_batch() -> Batch {
        Batch::new(
            Process {
                service_name: "svc".to_string(),
                tags: vec![KeyValue::string("hostname", "h1")],
            },
            vec![Span {
                trace_id: TraceId::new(1, 2),
                span_id: SpanId(3),
                parent_span_id: Some(SpanId(9)),
                operation_name: "op".to_string(),
                references: Vec::new(),
                flags: Flags(1),
                start_time: 1_500_000,
                duration: 2_250_000,
                tags: vec![KeyValue::float64("ratio", 0.5)],
                logs: vec![Log {
                    timestamp: 1_600_000,
                    fields: vec![KeyValue::string("event", "x")],
                }],
                process: None,
                warnings: Vec::new(),
            }],
        )
    }

    #[test]
    fn batch_round_trip() {
        let batch = sample_batch();
        let proto = batch_to_proto(&batch);
        assert_eq!(proto.spans[0].trace_id.len(), 16);
        assert_eq!(proto.spans[0].span_id.len(), 8);
        // The parent pointer travels as a child-of reference.
        assert_eq!(proto.spans[0].references.len(), 1);
        let back = batch_to_domain(proto).unwrap();
        let mut expected = batch;
        expected.spans[0].references = vec![SpanRef {
            ref_type: RefType::ChildOf,
            trace_id: TraceId::new(1, 2),
            span_id: SpanId(9),
        }];
        assert_eq!(back, expected);
    }

    #[test]
    fn timestamp_split_is_exact() {
        let ts = timestamp_from_micros(1_234_567);
        assert_eq!((ts.seconds, ts.nanos), (1, 234_567_000));
        assert_eq!(micros_from_timestamp(&ts), 1_234_567);
    }

    #[test]
    fn invalid_utf8_name_slots_decode_instead_of_failing() {
        let span = proto::Span {
            trace_id: vec![0; 16],
            span_id: vec![0; 8],
            operation_name: vec![0x6f, 0x70, 0xff],
            process: Some(proto::Process {
                service_name: vec![0x73, 0xfe],
                tags: vec![proto::KeyValue {
                    key: "label".to_string(),
                    v_type: proto::ValueType::String as i32,
                    v_str: vec![0x61, 0xff],
                    ..Default::default()
                }],
            }),
            ..Default::default()
        };
        let domain = span_to_domain(span).unwrap();
        assert_eq!(domain.operation_name, "op\u{fffd}");
        let process = domain.process.unwrap();
        assert_eq!(process.service_name, "s\u{fffd}");
        // Undecodable string values carry through as raw bytes for the
        // sanitizer to rewrite.
        assert_eq!(
            process.tags[0].value,
            TagValue::Binary(vec![0x61, 0xff])
        );
    }

    #[test]
    fn unknown_strategy_type_becomes_probabilistic_zero() {
        let response = proto::SamplingStrategyResponse {
            strategy_type: 42,
            ..Default::default()
        };
        let domain = strategy_to_domain(response);
        assert_eq!(
            domain.strategy_type,
            strategy::SamplingStrategyType::Probabilistic
        );
        assert_eq!(domain.probabilistic_sampling.unwrap().sampling_rate, 0.0);
    }
}
