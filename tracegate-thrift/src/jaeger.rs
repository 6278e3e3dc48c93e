//! Structs of the jaeger Thrift IDL: spans as they arrive over UDP and as
//! they are submitted to the collector's `Collector::submitBatches`.

use crate::{field_id, protocol_error};
use thrift::protocol::{
    TFieldIdentifier, TInputProtocol, TListIdentifier, TOutputProtocol, TStructIdentifier, TType,
};

/// Reads a string slot without rejecting invalid UTF-8: bad bytes decode
/// to replacement characters so the span survives to the sanitizers
/// instead of failing the whole datagram.
pub(crate) fn read_lossy_string(i_prot: &mut dyn TInputProtocol) -> thrift::Result<String> {
    let bytes = i_prot.read_bytes()?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagType {
    String,
    Double,
    Bool,
    Long,
    Binary,
}

impl TagType {
    pub fn from_i32(value: i32) -> thrift::Result<Self> {
        match value {
            0 => Ok(TagType::String),
            1 => Ok(TagType::Double),
            2 => Ok(TagType::Bool),
            3 => Ok(TagType::Long),
            4 => Ok(TagType::Binary),
            other => Err(protocol_error(format!("unknown tag type {other}"))),
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            TagType::String => 0,
            TagType::Double => 1,
            TagType::Bool => 2,
            TagType::Long => 3,
            TagType::Binary => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tag {
    pub key: String,
    pub v_type: i32,
    pub v_str: Option<String>,
    pub v_double: Option<f64>,
    pub v_bool: Option<bool>,
    pub v_long: Option<i64>,
    pub v_binary: Option<Vec<u8>>,
}

impl Tag {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            v_type: TagType::String.as_i32(),
            v_str: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self {
            key: key.into(),
            v_type: TagType::Bool.as_i32(),
            v_bool: Some(value),
            ..Default::default()
        }
    }

    pub fn long(key: impl Into<String>, value: i64) -> Self {
        Self {
            key: key.into(),
            v_type: TagType::Long.as_i32(),
            v_long: Some(value),
            ..Default::default()
        }
    }

    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut tag = Tag::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => tag.key = read_lossy_string(i_prot)?,
                2 => tag.v_type = i_prot.read_i32()?,
                3 => tag.v_str = Some(read_lossy_string(i_prot)?),
                4 => tag.v_double = Some(i_prot.read_double()?),
                5 => tag.v_bool = Some(i_prot.read_bool()?),
                6 => tag.v_long = Some(i_prot.read_i64()?),
                7 => tag.v_binary = Some(i_prot.read_bytes()?),
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        if tag.key.is_empty() {
            return Err(protocol_error("tag with empty key"));
        }
        Ok(tag)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Tag"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("key", TType::String, 1))?;
        o_prot.write_string(&self.key)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("vType", TType::I32, 2))?;
        o_prot.write_i32(self.v_type)?;
        o_prot.write_field_end()?;
        if let Some(v) = &self.v_str {
            o_prot.write_field_begin(&TFieldIdentifier::new("vStr", TType::String, 3))?;
            o_prot.write_string(v)?;
            o_prot.write_field_end()?;
        }
        if let Some(v) = self.v_double {
            o_prot.write_field_begin(&TFieldIdentifier::new("vDouble", TType::Double, 4))?;
            o_prot.write_double(v)?;
            o_prot.write_field_end()?;
        }
        if let Some(v) = self.v_bool {
            o_prot.write_field_begin(&TFieldIdentifier::new("vBool", TType::Bool, 5))?;
            o_prot.write_bool(v)?;
            o_prot.write_field_end()?;
        }
        if let Some(v) = self.v_long {
            o_prot.write_field_begin(&TFieldIdentifier::new("vLong", TType::I64, 6))?;
            o_prot.write_i64(v)?;
            o_prot.write_field_end()?;
        }
        if let Some(v) = &self.v_binary {
            o_prot.write_field_begin(&TFieldIdentifier::new("vBinary", TType::String, 7))?;
            o_prot.write_bytes(v)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Log {
    pub timestamp: i64,
    pub fields: Vec<Tag>,
}

impl Log {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut log = Log::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => log.timestamp = i_prot.read_i64()?,
                2 => log.fields = read_struct_list(i_prot, Tag::read)?,
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(log)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Log"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("timestamp", TType::I64, 1))?;
        o_prot.write_i64(self.timestamp)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("fields", TType::List, 2))?;
        write_struct_list(o_prot, &self.fields, Tag::write)?;
        o_prot.write_field_end()?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

pub const SPAN_REF_CHILD_OF: i32 = 0;
pub const SPAN_REF_FOLLOWS_FROM: i32 = 1;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpanRef {
    pub ref_type: i32,
    pub trace_id_low: i64,
    pub trace_id_high: i64,
    pub span_id: i64,
}

impl SpanRef {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut span_ref = SpanRef::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => span_ref.ref_type = i_prot.read_i32()?,
                2 => span_ref.trace_id_low = i_prot.read_i64()?,
                3 => span_ref.trace_id_high = i_prot.read_i64()?,
                4 => span_ref.span_id = i_prot.read_i64()?,
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(span_ref)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("SpanRef"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("refType", TType::I32, 1))?;
        o_prot.write_i32(self.ref_type)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("traceIdLow", TType::I64, 2))?;
        o_prot.write_i64(self.trace_id_low)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("traceIdHigh", TType::I64, 3))?;
        o_prot.write_i64(self.trace_id_high)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("spanId", TType::I64, 4))?;
        o_prot.write_i64(self.span_id)?;
        o_prot.write_field_end()?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Span {
    pub trace_id_low: i64,
    pub trace_id_high: i64,
    pub span_id: i64,
    pub parent_span_id: i64,
    pub operation_name: String,
    pub references: Vec<SpanRef>,
    pub flags: i32,
    pub start_time: i64,
    pub duration: i64,
    pub tags: Vec<Tag>,
    pub logs: Vec<Log>,
}

impl Span {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut span = Span::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => span.trace_id_low = i_prot.read_i64()?,
                2 => span.trace_id_high = i_prot.read_i64()?,
                3 => span.span_id = i_prot.read_i64()?,
                4 => span.parent_span_id = i_prot.read_i64()?,
                5 => span.operation_name = read_lossy_string(i_prot)?,
                6 => span.references = read_struct_list(i_prot, SpanRef::read)?,
                7 => span.flags = i_prot.read_i32()?,
                8 => span.start_time = i_prot.read_i64()?,
                9 => span.duration = i_prot.read_i64()?,
                10 => span.tags = read_struct_list(i_prot, Tag::read)?,
                11 => span.logs = read_struct_list(i_prot, Log::read)?,
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(span)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Span"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("traceIdLow", TType::I64, 1))?;
        o_prot.write_i64(self.trace_id_low)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("traceIdHigh", TType::I64, 2))?;
        o_prot.write_i64(self.trace_id_high)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("spanId", TType::I64, 3))?;
        o_prot.write_i64(self.span_id)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("parentSpanId", TType::I64, 4))?;
        o_prot.write_i64(self.parent_span_id)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("operationName", TType::String, 5))?;
        o_prot.write_string(&self.operation_name)?;
        o_prot.write_field_end()?;
        if !self.references.is_empty() {
            o_prot.write_field_begin(&TFieldIdentifier::new("references", TType::List, 6))?;
            write_struct_list(o_prot, &self.references, SpanRef::write)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_begin(&TFieldIdentifier::new("flags", TType::I32, 7))?;
        o_prot.write_i32(self.flags)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("startTime", TType::I64, 8))?;
        o_prot.write_i64(self.start_time)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("duration", TType::I64, 9))?;
        o_prot.write_i64(self.duration)?;
        o_prot.write_field_end()?;
        if !self.tags.is_empty() {
            o_prot.write_field_begin(&TFieldIdentifier::new("tags", TType::List, 10))?;
            write_struct_list(o_prot, &self.tags, Tag::write)?;
            o_prot.write_field_end()?;
        }
        if !self.logs.is_empty() {
            o_prot.write_field_begin(&TFieldIdentifier::new("logs", TType::List, 11))?;
            write_struct_list(o_prot, &self.logs, Log::write)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Process {
    pub service_name: String,
    pub tags: Vec<Tag>,
}

impl Process {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            tags: Vec::new(),
        }
    }

    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut process = Process::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => process.service_name = read_lossy_string(i_prot)?,
                2 => process.tags = read_struct_list(i_prot, Tag::read)?,
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(process)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Process"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("serviceName", TType::String, 1))?;
        o_prot.write_string(&self.service_name)?;
        o_prot.write_field_end()?;
        if !self.tags.is_empty() {
            o_prot.write_field_begin(&TFieldIdentifier::new("tags", TType::List, 2))?;
            write_struct_list(o_prot, &self.tags, Tag::write)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientStats {
    pub full_queue_dropped_spans: i64,
    pub too_large_dropped_spans: i64,
    pub failed_to_emit_spans: i64,
}

impl ClientStats {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut stats = ClientStats::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => stats.full_queue_dropped_spans = i_prot.read_i64()?,
                2 => stats.too_large_dropped_spans = i_prot.read_i64()?,
                3 => stats.failed_to_emit_spans = i_prot.read_i64()?,
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(stats)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("ClientStats"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new(
            "fullQueueDroppedSpans",
            TType::I64,
            1,
        ))?;
        o_prot.write_i64(self.full_queue_dropped_spans)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new(
            "tooLargeDroppedSpans",
            TType::I64,
            2,
        ))?;
        o_prot.write_i64(self.too_large_dropped_spans)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("failedToEmitSpans", TType::I64, 3))?;
        o_prot.write_i64(self.failed_to_emit_spans)?;
        o_prot.write_field_end()?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    pub process: Process,
    pub spans: Vec<Span>,
    pub seq_no: Option<i64>,
    pub stats: Option<ClientStats>,
}

impl Batch {
    pub fn new(process: Process, spans: Vec<Span>) -> Self {
        Self {
            process,
            spans,
            seq_no: None,
            stats: None,
        }
    }

    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut batch = Batch::default();
        let mut saw_process = false;
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => {
                    batch.process = Process::read(i_prot)?;
                    saw_process = true;
                }
                2 => batch.spans = read_struct_list(i_prot, Span::read)?,
                3 => batch.seq_no = Some(i_prot.read_i64()?),
                4 => batch.stats = Some(ClientStats::read(i_prot)?),
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        if !saw_process {
            return Err(protocol_error("batch without a process"));
        }
        Ok(batch)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("Batch"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("process", TType::Struct, 1))?;
        self.process.write(o_prot)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("spans", TType::List, 2))?;
        write_struct_list(o_prot, &self.spans, Span::write)?;
        o_prot.write_field_end()?;
        if let Some(seq_no) = self.seq_no {
            o_prot.write_field_begin(&TFieldIdentifier::new("seqNo", TType::I64, 3))?;
            o_prot.write_i64(seq_no)?;
            o_prot.write_field_end()?;
        }
        if let Some(stats) = &self.stats {
            o_prot.write_field_begin(&TFieldIdentifier::new("stats", TType::Struct, 4))?;
            stats.write(o_prot)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSubmitResponse {
    pub ok: bool,
}

impl BatchSubmitResponse {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut response = BatchSubmitResponse::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => response.ok = i_prot.read_bool()?,
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(response)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("BatchSubmitResponse"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("ok", TType::Bool, 1))?;
        o_prot.write_bool(self.ok)?;
        o_prot.write_field_end()?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

/// Decodes a batch posted as a bare binary-protocol struct, the body shape
/// of the collector's HTTP ingest route.
pub fn decode_binary_batch(bytes: &[u8]) -> thrift::Result<Batch> {
    let mut reader = bytes;
    let mut i_prot = thrift::protocol::TBinaryInputProtocol::new(&mut reader, true);
    Batch::read(&mut i_prot)
}

pub(crate) fn read_struct_list<T>(
    i_prot: &mut dyn TInputProtocol,
    read_one: impl Fn(&mut dyn TInputProtocol) -> thrift::Result<T>,
) -> thrift::Result<Vec<T>> {
    let list_ident = i_prot.read_list_begin()?;
    let mut items = Vec::with_capacity(list_ident.size.max(0) as usize);
    for _ in 0..list_ident.size {
        items.push(read_one(i_prot)?);
    }
    i_prot.read_list_end()?;
    Ok(items)
}

pub(crate) fn write_struct_list<T>(
    o_prot: &mut dyn TOutputProtocol,
    items: &[T],
    write_one: impl Fn(&T, &mut dyn TOutputProtocol) -> thrift::Result<()>,
) -> thrift::Result<()> {
    o_prot.write_list_begin(&TListIdentifier::new(TType::Struct, items.len() as i32))?;
    for item in items {
        write_one(item, o_prot)?;
    }
    o_prot.write_list_end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use thrift::protocol::{TCompactInputProtocol, TCompactOutputProtocol};

    fn sample_batch() -> Batch {
        let mut process = Process::new("svc");
        process.tags.push(Tag::string("hostname", "h1"));
        Batch {
            process,
            spans: vec![Span {
                trace_id_low: 2,
                trace_id_high: 1,
                span_id: 3,
                parent_span_id: 0,
                operation_name: "span1".to_string(),
                references: vec![SpanRef {
                    ref_type: SPAN_REF_CHILD_OF,
                    trace_id_low: 2,
                    trace_id_high: 1,
                    span_id: 9,
                }],
                flags: 1,
                start_time: 1_000,
                duration: 10,
                tags: vec![Tag::bool("error", false), Tag::long("n", 42)],
                logs: vec![Log {
                    timestamp: 1_001,
                    fields: vec![Tag::string("event", "x")],
                }],
            }],
            seq_no: Some(7),
            stats: Some(ClientStats {
                full_queue_dropped_spans: 1,
                too_large_dropped_spans: 0,
                failed_to_emit_spans: 2,
            }),
        }
    }

    #[test]
    fn batch_round_trips_through_compact_protocol() {
        let batch = sample_batch();
        let mut buf = Vec::new();
        batch
            .write(&mut TCompactOutputProtocol::new(&mut buf))
            .unwrap();
        let mut reader = buf.as_slice();
        let decoded = Batch::read(&mut TCompactInputProtocol::new(&mut reader)).unwrap();
        assert_eq!(decoded, batch);
    }

    #[test]
    fn invalid_utf8_string_slots_decode_lossily() {
        // A tag whose vStr slot holds raw non-UTF-8 bytes, as a broken
        // client could emit it.
        let mut buf = Vec::new();
        {
            let mut o_prot = TCompactOutputProtocol::new(&mut buf);
            o_prot
                .write_struct_begin(&TStructIdentifier::new("Tag"))
                .unwrap();
            o_prot
                .write_field_begin(&TFieldIdentifier::new("key", TType::String, 1))
                .unwrap();
            o_prot.write_string("k").unwrap();
            o_prot.write_field_end().unwrap();
            o_prot
                .write_field_begin(&TFieldIdentifier::new("vType", TType::I32, 2))
                .unwrap();
            o_prot.write_i32(TagType::String.as_i32()).unwrap();
            o_prot.write_field_end().unwrap();
            o_prot
                .write_field_begin(&TFieldIdentifier::new("vStr", TType::String, 3))
                .unwrap();
            o_prot.write_bytes(&[0x66, 0xff, 0xfe]).unwrap();
            o_prot.write_field_end().unwrap();
            o_prot.write_field_stop().unwrap();
            o_prot.write_struct_end().unwrap();
        }
        let mut reader = buf.as_slice();
        let tag = Tag::read(&mut TCompactInputProtocol::new(&mut reader)).unwrap();
        assert_eq!(tag.key, "k");
        assert_eq!(tag.v_str.unwrap(), "f\u{fffd}\u{fffd}");
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let batch = sample_batch();
        let mut buf = Vec::new();
        batch
            .write(&mut TCompactOutputProtocol::new(&mut buf))
            .unwrap();
        buf.truncate(buf.len() / 2);
        let mut reader = buf.as_slice();
        assert!(Batch::read(&mut TCompactInputProtocol::new(&mut reader)).is_err());
    }
}
