use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// Ingest counters, labelled by the transport format the batch arrived in.
#[derive(Clone)]
pub struct IngestMetrics {
    batches_received: IntCounterVec,
    spans_received: IntCounterVec,
    spans_rejected: IntCounterVec,
    spans_saved: IntCounterVec,
}

#[derive(Clone)]
pub struct FormatIngestMetrics {
    pub batches_received: IntCounter,
    pub spans_received: IntCounter,
    pub spans_rejected: IntCounter,
    pub spans_saved: IntCounter,
}

impl IngestMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let batches_received = IntCounterVec::new(
            Opts::new(
                "tracegate_collector_batches_received_total",
                "span batches received on the ingest edge",
            ),
            &["format"],
        )?;
        let spans_received = IntCounterVec::new(
            Opts::new(
                "tracegate_collector_spans_received_total",
                "spans received on the ingest edge",
            ),
            &["format"],
        )?;
        let spans_rejected = IntCounterVec::new(
            Opts::new(
                "tracegate_collector_spans_rejected_total",
                "spans rejected before processing",
            ),
            &["format"],
        )?;
        let spans_saved = IntCounterVec::new(
            Opts::new(
                "tracegate_collector_spans_saved_total",
                "spans accepted by the span processor",
            ),
            &["format"],
        )?;
        registry.register(Box::new(batches_received.clone()))?;
        registry.register(Box::new(spans_received.clone()))?;
        registry.register(Box::new(spans_rejected.clone()))?;
        registry.register(Box::new(spans_saved.clone()))?;
        Ok(Self {
            batches_received,
            spans_received,
            spans_rejected,
            spans_saved,
        })
    }

    pub fn for_format(&self, format: &str) -> FormatIngestMetrics {
        FormatIngestMetrics {
            batches_received: self.batches_received.with_label_values(&[format]),
            spans_received: self.spans_received.with_label_values(&[format]),
            spans_rejected: self.spans_rejected.with_label_values(&[format]),
            spans_saved: self.spans_saved.with_label_values(&[format]),
        }
    }
}
