//! Domain model shared by the agent, the collector ingest edge and the
//! anonymization pipeline: trace/span identifiers, spans with their owning
//! process, batches, and the sampling-strategy variants served to clients.

mod ids;
mod keyvalue;
mod span;
pub mod strategy;
pub mod ui;

pub use ids::{InvalidId, SpanId, TraceId};
pub use keyvalue::{KeyValue, TagValue};
pub use span::{
    Batch, ClientStats, Flags, Log, Process, RefType, Span, SpanRef, FLAG_DEBUG, FLAG_SAMPLED,
};

/// Tag keys that survive anonymization and that the collector sanitizers
/// treat as structural. The anonymizer whitelist and the sanitizer whitelist
/// are deliberately the same set.
pub const STANDARD_TAG_KEYS: [&str; 6] = [
    "error",
    "http.method",
    "http.status_code",
    "span.kind",
    "sampler.type",
    "sampler.param",
];

/// Process tag carrying the tracer instance id, used to key per-client
/// accounting on the agent.
pub const CLIENT_UUID_TAG_KEY: &str = "client-uuid";
