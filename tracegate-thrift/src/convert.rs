//! Conversions from the wire structs into the domain model. Jaeger batches
//! convert field-for-field; zipkin spans need the annotation heuristics
//! (cs/cr/ss/sr → span.kind and timing) before they fit the model.

use crate::{jaeger, zipkin, DecodeError};
use tracegate_model::{
    Batch, ClientStats, Flags, KeyValue, Log, Process, RefType, Span, SpanId, SpanRef, TagValue,
    TraceId,
};

pub fn tag_to_domain(tag: jaeger::Tag) -> Result<KeyValue, DecodeError> {
    let tag_type = jaeger::TagType::from_i32(tag.v_type)?;
    let value = match tag_type {
        jaeger::TagType::String => tag.v_str.map(TagValue::String),
        jaeger::TagType::Double => tag.v_double.map(TagValue::Float64),
        jaeger::TagType::Bool => tag.v_bool.map(TagValue::Bool),
        jaeger::TagType::Long => tag.v_long.map(TagValue::Int64),
        jaeger::TagType::Binary => tag.v_binary.map(TagValue::Binary),
    }
    .ok_or_else(|| {
        DecodeError::Malformed(format!("tag '{}' missing its typed value", tag.key))
    })?;
    Ok(KeyValue {
        key: tag.key,
        value,
    })
}

pub fn process_to_domain(process: jaeger::Process) -> Result<Process, DecodeError> {
    Ok(Process {
        service_name: process.service_name,
        tags: process
            .tags
            .into_iter()
            .map(tag_to_domain)
            .collect::<Result<_, _>>()?,
    })
}

pub fn span_to_domain(span: jaeger::Span) -> Result<Span, DecodeError> {
    Ok(Span {
        trace_id: TraceId::new(span.trace_id_high as u64, span.trace_id_low as u64),
        span_id: SpanId(span.span_id as u64),
        parent_span_id: (span.parent_span_id != 0).then_some(SpanId(span.parent_span_id as u64)),
        operation_name: span.operation_name,
        references: span
            .references
            .into_iter()
            .map(|r| {
                let ref_type = match r.ref_type {
                    jaeger::SPAN_REF_CHILD_OF => RefType::ChildOf,
                    jaeger::SPAN_REF_FOLLOWS_FROM => RefType::FollowsFrom,
                    other => {
                        return Err(DecodeError::Malformed(format!(
                            "unknown span reference type {other}"
                        )))
                    }
                };
                Ok(SpanRef {
                    ref_type,
                    trace_id: TraceId::new(r.trace_id_high as u64, r.trace_id_low as u64),
                    span_id: SpanId(r.span_id as u64),
                })
            })
            .collect::<Result<_, _>>()?,
        flags: Flags(span.flags as u32),
        // Negative values violate the model invariants; saturate rather than
        // fail the whole batch.
        start_time: span.start_time.max(0) as u64,
        duration: span.duration.max(0) as u64,
        tags: span
            .tags
            .into_iter()
            .map(tag_to_domain)
            .collect::<Result<_, _>>()?,
        logs: span
            .logs
            .into_iter()
            .map(|log| {
                Ok(Log {
                    timestamp: log.timestamp.max(0) as u64,
                    fields: log
                        .fields
                        .into_iter()
                        .map(tag_to_domain)
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?,
        process: None,
        warnings: Vec::new(),
    })
}

pub fn batch_to_domain(batch: jaeger::Batch) -> Result<Batch, DecodeError> {
    Ok(Batch {
        process: process_to_domain(batch.process)?,
        spans: batch
            .spans
            .into_iter()
            .map(span_to_domain)
            .collect::<Result<_, _>>()?,
        seq_no: batch.seq_no,
        stats: batch.stats.map(|s| ClientStats {
            full_queue_dropped_spans: s.full_queue_dropped_spans,
            too_large_dropped_spans: s.too_large_dropped_spans,
            failed_to_emit_spans: s.failed_to_emit_spans,
        }),
    })
}

/// Converts zipkin spans to domain batches, grouping consecutive spans that
/// share a service name. Unknown services group under "unknown-service".
pub fn zipkin_to_domain(spans: Vec<zipkin::Span>) -> Result<Vec<Batch>, DecodeError> {
    let mut batches: Vec<Batch> = Vec::new();
    for span in spans {
        let (span, process) = zipkin_span_to_domain(span)?;
        match batches.last_mut() {
            Some(batch) if batch.process == process => batch.spans.push(span),
            _ => batches.push(Batch::new(process, vec![span])),
        }
    }
    Ok(batches)
}

fn zipkin_span_to_domain(span: zipkin::Span) -> Result<(Span, Process), DecodeError> {
    let mut process = Process::new("unknown-service");
    let mut tags = Vec::new();
    let mut logs = Vec::new();
    let mut kind: Option<&'static str> = None;
    let mut first_core_ts: Option<i64> = None;
    let mut last_core_ts: Option<i64> = None;

    for annotation in &span.annotations {
        if let Some(host) = &annotation.host {
            if !host.service_name.is_empty() && process.service_name == "unknown-service" {
                process = endpoint_to_process(host);
            }
        }
        match annotation.value.as_str() {
            zipkin::ANNOTATION_CLIENT_SEND | zipkin::ANNOTATION_CLIENT_RECV => {
                kind = Some("client");
                track_core_timestamps(annotation.timestamp, &mut first_core_ts, &mut last_core_ts);
            }
            zipkin::ANNOTATION_SERVER_SEND | zipkin::ANNOTATION_SERVER_RECV => {
                kind = Some("server");
                track_core_timestamps(annotation.timestamp, &mut first_core_ts, &mut last_core_ts);
            }
            other => logs.push(Log {
                timestamp: annotation.timestamp.max(0) as u64,
                fields: vec![KeyValue::string("event", other)],
            }),
        }
    }

    if let Some(kind) = kind {
        tags.push(KeyValue::string("span.kind", kind));
    }

    for annotation in span.binary_annotations {
        if let Some(host) = &annotation.host {
            if !host.service_name.is_empty() && process.service_name == "unknown-service" {
                process = endpoint_to_process(host);
            }
        }
        tags.push(binary_annotation_to_tag(annotation)?);
    }

    let start_time = span
        .timestamp
        .or(first_core_ts)
        .unwrap_or_default()
        .max(0) as u64;
    let duration = span
        .duration
        .or_else(|| match (first_core_ts, last_core_ts) {
            (Some(first), Some(last)) if last > first => Some(last - first),
            _ => None,
        })
        .unwrap_or_default()
        .max(0) as u64;

    let mut flags = Flags::default();
    flags.set_sampled();
    if span.debug {
        flags.set_debug();
    }

    let domain_span = Span {
        trace_id: TraceId::new(
            span.trace_id_high.unwrap_or_default() as u64,
            span.trace_id as u64,
        ),
        span_id: SpanId(span.id as u64),
        parent_span_id: span
            .parent_id
            .and_then(|id| (id != 0).then_some(SpanId(id as u64))),
        operation_name: span.name,
        references: Vec::new(),
        flags,
        start_time,
        duration,
        tags,
        logs,
        process: None,
        warnings: Vec::new(),
    };
    Ok((domain_span, process))
}

fn track_core_timestamps(timestamp: i64, first: &mut Option<i64>, last: &mut Option<i64>) {
    if first.map_or(true, |f| timestamp < f) {
        *first = Some(timestamp);
    }
    if last.map_or(true, |l| timestamp > l) {
        *last = Some(timestamp);
    }
}

fn endpoint_to_process(endpoint: &zipkin::Endpoint) -> Process {
    let mut process = Process::new(endpoint.service_name.clone());
    if endpoint.ipv4 != 0 {
        let ip = endpoint.ipv4 as u32;
        process.tags.push(KeyValue::string(
            "ip",
            format!(
                "{}.{}.{}.{}",
                (ip >> 24) & 0xff,
                (ip >> 16) & 0xff,
                (ip >> 8) & 0xff,
                ip & 0xff
            ),
        ));
    }
    process
}

fn binary_annotation_to_tag(annotation: zipkin::BinaryAnnotation) -> Result<KeyValue, DecodeError> {
    let key = annotation.key;
    let value = annotation.value;
    let annotation_type = zipkin::AnnotationType::from_i32(annotation.annotation_type)?;
    let malformed =
        |what: &str| DecodeError::Malformed(format!("binary annotation '{key}' is not {what}"));

    let tag_value = match annotation_type {
        zipkin::AnnotationType::Bool => TagValue::Bool(value.first().copied().unwrap_or(0) != 0),
        zipkin::AnnotationType::Bytes => TagValue::Binary(value),
        zipkin::AnnotationType::I16 => {
            let bytes: [u8; 2] = value.as_slice().try_into().map_err(|_| malformed("i16"))?;
            TagValue::Int64(i16::from_be_bytes(bytes) as i64)
        }
        zipkin::AnnotationType::I32 => {
            let bytes: [u8; 4] = value.as_slice().try_into().map_err(|_| malformed("i32"))?;
            TagValue::Int64(i32::from_be_bytes(bytes) as i64)
        }
        zipkin::AnnotationType::I64 => {
            let bytes: [u8; 8] = value.as_slice().try_into().map_err(|_| malformed("i64"))?;
            TagValue::Int64(i64::from_be_bytes(bytes))
        }
        zipkin::AnnotationType::Double => {
            let bytes: [u8; 8] = value
                .as_slice()
                .try_into()
                .map_err(|_| malformed("a double"))?;
            TagValue::Float64(f64::from_bits(u64::from_be_bytes(bytes)))
        }
        zipkin::AnnotationType::String => TagValue::String(
            String::from_utf8(value).map_err(|_| malformed("utf-8"))?,
        ),
    };
    Ok(KeyValue {
        key,
        value: tag_value,
    })
}
