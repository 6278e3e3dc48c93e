//! Metric families for the relay pipeline. Everything registers against an
//! injected [`prometheus::Registry`]; per-format handles are bound children
//! of labelled vectors so the hot path never formats label strings.

use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};

/// UDP ingest counters, labelled by wire format.
#[derive(Clone)]
pub struct ServerMetrics {
    packets_processed: IntCounterVec,
    packets_dropped: IntCounterVec,
    read_errors: IntCounterVec,
    packet_size: HistogramVec,
}

#[derive(Clone)]
pub struct FormatServerMetrics {
    pub packets_processed: IntCounter,
    pub packets_dropped: IntCounter,
    pub read_errors: IntCounter,
    pub packet_size: Histogram,
}

impl ServerMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let packets_processed = IntCounterVec::new(
            Opts::new(
                "tracegate_agent_udp_packets_processed_total",
                "datagrams read off a udp socket",
            ),
            &["format"],
        )?;
        let packets_dropped = IntCounterVec::new(
            Opts::new(
                "tracegate_agent_udp_packets_dropped_total",
                "datagrams dropped because the processor queue was full",
            ),
            &["format"],
        )?;
        let read_errors = IntCounterVec::new(
            Opts::new(
                "tracegate_agent_udp_read_errors_total",
                "udp socket read failures",
            ),
            &["format"],
        )?;
        let packet_size = HistogramVec::new(
            HistogramOpts::new(
                "tracegate_agent_udp_packet_size_bytes",
                "size of received datagrams",
            )
            .buckets(prometheus::exponential_buckets(64.0, 4.0, 8)?),
            &["format"],
        )?;
        registry.register(Box::new(packets_processed.clone()))?;
        registry.register(Box::new(packets_dropped.clone()))?;
        registry.register(Box::new(read_errors.clone()))?;
        registry.register(Box::new(packet_size.clone()))?;
        Ok(Self {
            packets_processed,
            packets_dropped,
            read_errors,
            packet_size,
        })
    }

    pub fn for_format(&self, format: &str) -> FormatServerMetrics {
        FormatServerMetrics {
            packets_processed: self.packets_processed.with_label_values(&[format]),
            packets_dropped: self.packets_dropped.with_label_values(&[format]),
            read_errors: self.read_errors.with_label_values(&[format]),
            packet_size: self.packet_size.with_label_values(&[format]),
        }
    }
}

/// Processor-side counters, labelled by wire format.
#[derive(Clone)]
pub struct ProcessorMetrics {
    decode_errors: IntCounterVec,
    spans_throttled: IntCounterVec,
}

#[derive(Clone)]
pub struct FormatProcessorMetrics {
    pub decode_errors: IntCounter,
    pub spans_throttled: IntCounter,
}

impl ProcessorMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let decode_errors = IntCounterVec::new(
            Opts::new(
                "tracegate_agent_processor_decode_errors_total",
                "datagrams that failed thrift decoding",
            ),
            &["format"],
        )?;
        let spans_throttled = IntCounterVec::new(
            Opts::new(
                "tracegate_agent_processor_spans_throttled_total",
                "spans dropped because the client was over its credit balance",
            ),
            &["format"],
        )?;
        registry.register(Box::new(decode_errors.clone()))?;
        registry.register(Box::new(spans_throttled.clone()))?;
        Ok(Self {
            decode_errors,
            spans_throttled,
        })
    }

    pub fn for_format(&self, format: &str) -> FormatProcessorMetrics {
        FormatProcessorMetrics {
            decode_errors: self.decode_errors.with_label_values(&[format]),
            spans_throttled: self.spans_throttled.with_label_values(&[format]),
        }
    }
}

/// Submission counters shared by all reporter decorators, labelled by the
/// batch format ("jaeger" or "zipkin").
#[derive(Clone)]
pub struct ReporterMetrics {
    batches_submitted: IntCounterVec,
    batches_failures: IntCounterVec,
    spans_submitted: IntCounterVec,
    spans_failures: IntCounterVec,
    batch_size: IntGaugeVec,
    submit_latency: HistogramVec,
}

#[derive(Clone)]
pub struct FormatReporterMetrics {
    pub batches_submitted: IntCounter,
    pub batches_failures: IntCounter,
    pub spans_submitted: IntCounter,
    pub spans_failures: IntCounter,
    pub batch_size: IntGauge,
    pub submit_latency: Histogram,
}

impl ReporterMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let batches_submitted = IntCounterVec::new(
            Opts::new(
                "tracegate_agent_reporter_batches_submitted_total",
                "batches accepted by the collector",
            ),
            &["format"],
        )?;
        let batches_failures = IntCounterVec::new(
            Opts::new(
                "tracegate_agent_reporter_batches_failures_total",
                "batches the collector rejected or that failed in transit",
            ),
            &["format"],
        )?;
        let spans_submitted = IntCounterVec::new(
            Opts::new(
                "tracegate_agent_reporter_spans_submitted_total",
                "spans accepted by the collector",
            ),
            &["format"],
        )?;
        let spans_failures = IntCounterVec::new(
            Opts::new(
                "tracegate_agent_reporter_spans_failures_total",
                "spans the collector rejected or that failed in transit",
            ),
            &["format"],
        )?;
        let batch_size = IntGaugeVec::new(
            Opts::new(
                "tracegate_agent_reporter_batch_size",
                "span count of the most recent successful batch",
            ),
            &["format"],
        )?;
        let submit_latency = HistogramVec::new(
            HistogramOpts::new(
                "tracegate_agent_reporter_submit_latency_seconds",
                "collector submission latency",
            ),
            &["format"],
        )?;
        registry.register(Box::new(batches_submitted.clone()))?;
        registry.register(Box::new(batches_failures.clone()))?;
        registry.register(Box::new(spans_submitted.clone()))?;
        registry.register(Box::new(spans_failures.clone()))?;
        registry.register(Box::new(batch_size.clone()))?;
        registry.register(Box::new(submit_latency.clone()))?;
        Ok(Self {
            batches_submitted,
            batches_failures,
            spans_submitted,
            spans_failures,
            batch_size,
            submit_latency,
        })
    }

    pub fn for_format(&self, format: &str) -> FormatReporterMetrics {
        FormatReporterMetrics {
            batches_submitted: self.batches_submitted.with_label_values(&[format]),
            batches_failures: self.batches_failures.with_label_values(&[format]),
            spans_submitted: self.spans_submitted.with_label_values(&[format]),
            spans_failures: self.spans_failures.with_label_values(&[format]),
            batch_size: self.batch_size.with_label_values(&[format]),
            submit_latency: self.submit_latency.with_label_values(&[format]),
        }
    }
}

/// Tracer-side emission counters republished from batch client stats.
#[derive(Clone)]
pub struct ClientStatsMetrics {
    pub batches_received: IntCounter,
    pub full_queue_dropped_spans: IntCounter,
    pub too_large_dropped_spans: IntCounter,
    pub failed_to_emit_spans: IntCounter,
}

impl ClientStatsMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let batches_received = IntCounter::with_opts(Opts::new(
            "tracegate_agent_client_stats_batches_received_total",
            "batches carrying tracer-side stats",
        ))?;
        let full_queue_dropped_spans = IntCounter::with_opts(Opts::new(
            "tracegate_agent_client_stats_full_queue_dropped_spans_total",
            "spans tracers dropped on a full in-process queue",
        ))?;
        let too_large_dropped_spans = IntCounter::with_opts(Opts::new(
            "tracegate_agent_client_stats_too_large_dropped_spans_total",
            "spans tracers dropped for exceeding the datagram size",
        ))?;
        let failed_to_emit_spans = IntCounter::with_opts(Opts::new(
            "tracegate_agent_client_stats_failed_to_emit_spans_total",
            "spans tracers failed to emit",
        ))?;
        registry.register(Box::new(batches_received.clone()))?;
        registry.register(Box::new(full_queue_dropped_spans.clone()))?;
        registry.register(Box::new(too_large_dropped_spans.clone()))?;
        registry.register(Box::new(failed_to_emit_spans.clone()))?;
        Ok(Self {
            batches_received,
            full_queue_dropped_spans,
            too_large_dropped_spans,
            failed_to_emit_spans,
        })
    }
}

/// `{endpoint, result}` counters around the client-config managers.
#[derive(Clone)]
pub struct ConfigManagerMetrics {
    requests: IntCounterVec,
}

impl ConfigManagerMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let requests = IntCounterVec::new(
            Opts::new(
                "tracegate_agent_config_manager_requests_total",
                "collector config queries by endpoint and result",
            ),
            &["endpoint", "result"],
        )?;
        registry.register(Box::new(requests.clone()))?;
        Ok(Self { requests })
    }

    pub fn ok(&self, endpoint: &str) -> IntCounter {
        self.requests.with_label_values(&[endpoint, "ok"])
    }

    pub fn err(&self, endpoint: &str) -> IntCounter {
        self.requests.with_label_values(&[endpoint, "err"])
    }
}
