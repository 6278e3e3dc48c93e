//! Collector-side ingest logic: span sanitizers, the processing seam behind
//! the gRPC handler, and the file-backed sampling-strategy store.

pub mod metrics;
pub mod processor;
pub mod sanitizer;
pub mod strategy;
