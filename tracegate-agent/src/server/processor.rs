use crate::metrics::FormatProcessorMetrics;
use crate::reporter::Reporter;
use crate::throttle::Throttler;
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracegate_model::CLIENT_UUID_TAG_KEY;
use tracegate_thrift::{agent, jaeger, Protocol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    JaegerCompact,
    JaegerBinary,
    ZipkinCompact,
}

impl WireFormat {
    pub fn protocol(&self) -> Protocol {
        match self {
            WireFormat::JaegerCompact | WireFormat::ZipkinCompact => Protocol::Compact,
            WireFormat::JaegerBinary => Protocol::Binary,
        }
    }

    /// Metric label; both jaeger variants report as one format.
    pub fn label(&self) -> &'static str {
        match self {
            WireFormat::JaegerCompact => "jaeger-compact",
            WireFormat::JaegerBinary => "jaeger-binary",
            WireFormat::ZipkinCompact => "zipkin-compact",
        }
    }
}

/// Drains the datagram queue with a fixed pool of workers. Each worker
/// deserializes one payload and hands the batch to the reporter
/// synchronously; failures are counted and logged, never retried.
pub struct ThriftProcessor {
    format: WireFormat,
    reporter: Arc<dyn Reporter>,
    throttler: Option<Arc<Throttler>>,
    metrics: FormatProcessorMetrics,
}

impl ThriftProcessor {
    pub fn new(
        format: WireFormat,
        reporter: Arc<dyn Reporter>,
        throttler: Option<Arc<Throttler>>,
        metrics: FormatProcessorMetrics,
    ) -> Self {
        Self {
            format,
            reporter,
            throttler,
            metrics,
        }
    }

    /// Runs until the queue closes (all server senders dropped), at which
    /// point in-flight workers drain and the call returns.
    pub async fn run(self, rx: mpsc::Receiver<Bytes>, workers: usize) {
        let processor = Arc::new(self);
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|payload| (payload, rx))
        });
        stream
            .for_each_concurrent(workers, |payload| {
                let processor = Arc::clone(&processor);
                async move { processor.process(payload).await }
            })
            .await;
    }

    async fn process(&self, payload: Bytes) {
        match self.format {
            WireFormat::JaegerCompact | WireFormat::JaegerBinary => {
                match agent::decode_emit_batch(&payload, self.format.protocol()) {
                    Ok(mut batch) => {
                        if self.throttler.is_some() {
                            self.enforce_credits(&mut batch);
                        }
                        // Failure counters live in the metrics reporter
                        // decorator; nothing to do with the error here.
                        let _ = self.reporter.emit_batch(&batch).await;
                    }
                    Err(err) => {
                        self.metrics.decode_errors.inc();
                        tracing::error!(
                            error = %err,
                            format = self.format.label(),
                            "dropping undecodable datagram"
                        );
                    }
                }
            }
            WireFormat::ZipkinCompact => {
                match agent::decode_emit_zipkin_batch(&payload, self.format.protocol()) {
                    Ok(spans) if spans.is_empty() => {}
                    Ok(spans) => {
                        let _ = self.reporter.emit_zipkin_batch(&spans).await;
                    }
                    Err(err) => {
                        self.metrics.decode_errors.inc();
                        tracing::error!(
                            error = %err,
                            format = self.format.label(),
                            "dropping undecodable datagram"
                        );
                    }
                }
            }
        }
    }

    /// Spends one credit per span; spans whose client is over budget are
    /// dropped from the batch and counted.
    fn enforce_credits(&self, batch: &mut jaeger::Batch) {
        let Some(throttler) = &self.throttler else {
            return;
        };
        let service = batch.process.service_name.clone();
        let client_id = batch
            .process
            .tags
            .iter()
            .find(|tag| tag.key == CLIENT_UUID_TAG_KEY)
            .and_then(|tag| tag.v_str.clone())
            .unwrap_or_default();

        batch.spans.retain(|span| {
            match throttler.spend(&service, &client_id, &span.operation_name, 1.0) {
                Ok(()) => true,
                Err(err) => {
                    self.metrics.spans_throttled.inc();
                    tracing::debug!(
                        service,
                        client_id,
                        operation = span.operation_name,
                        error = %err,
                        "span dropped as over-quota"
                    );
                    false
                }
            }
        });
    }
}
