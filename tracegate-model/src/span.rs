use crate::{KeyValue, SpanId, TraceId};

pub const FLAG_SAMPLED: u32 = 1;
pub const FLAG_DEBUG: u32 = 2;

/// Span flag bitset (`Sampled`, `Debug`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags(pub u32);

impl Flags {
    pub fn is_sampled(&self) -> bool {
        self.0 & FLAG_SAMPLED != 0
    }

    pub fn is_debug(&self) -> bool {
        self.0 & FLAG_DEBUG != 0
    }

    pub fn set_sampled(&mut self) {
        self.0 |= FLAG_SAMPLED;
    }

    pub fn set_debug(&mut self) {
        self.0 |= FLAG_DEBUG;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefType {
    ChildOf,
    FollowsFrom,
}

/// Reference to another span. The referenced trace id normally equals the
/// owning span's trace id; cross-trace references are permitted but must be
/// explicit in the data.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRef {
    pub ref_type: RefType,
    pub trace_id: TraceId,
    pub span_id: SpanId,
}

/// Timestamped list of fields attached to a span.
#[derive(Debug, Clone, PartialEq)]
pub struct Log {
    /// Wall-clock microseconds since the unix epoch.
    pub timestamp: u64,
    pub fields: Vec<KeyValue>,
}

/// Origin of a batch of spans: the emitting service plus process-level tags.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Process {
    pub service_name: String,
    pub tags: Vec<KeyValue>,
}

impl Process {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            tags: Vec::new(),
        }
    }

    /// Value of a string-typed process tag, if present.
    pub fn tag_str(&self, key: &str) -> Option<&str> {
        self.tags.iter().find(|kv| kv.key == key).and_then(|kv| {
            if let crate::TagValue::String(s) = &kv.value {
                Some(s.as_str())
            } else {
                None
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Span {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub operation_name: String,
    pub references: Vec<SpanRef>,
    pub flags: Flags,
    /// Wall-clock microseconds since the unix epoch; positive by invariant.
    pub start_time: u64,
    /// Microseconds; non-negative by construction.
    pub duration: u64,
    pub tags: Vec<KeyValue>,
    pub logs: Vec<Log>,
    /// Owning process. Spans travelling inside a [`Batch`] leave this unset
    /// and inherit the batch process; standalone spans (collector ingest,
    /// anonymizer) carry it embedded.
    pub process: Option<Process>,
    pub warnings: Vec<String>,
}

impl Span {
    pub fn service_name(&self) -> &str {
        self.process
            .as_ref()
            .map(|p| p.service_name.as_str())
            .unwrap_or_default()
    }
}

/// Tracer-side emission counters piggybacked on a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientStats {
    pub full_queue_dropped_spans: i64,
    pub too_large_dropped_spans: i64,
    pub failed_to_emit_spans: i64,
}

/// One process plus the ordered spans shipped in a single RPC.
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
}
