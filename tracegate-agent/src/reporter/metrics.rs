use super::{Reporter, SubmitError};
use crate::metrics::{ClientStatsMetrics, FormatReporterMetrics, ReporterMetrics};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracegate_model::CLIENT_UUID_TAG_KEY;
use tracegate_thrift::{jaeger, zipkin};

/// Decorator counting submissions and observing latency per batch format.
pub struct MetricsReporter {
    inner: Arc<dyn Reporter>,
    jaeger: FormatReporterMetrics,
    zipkin: FormatReporterMetrics,
}

impl MetricsReporter {
    pub fn new(inner: Arc<dyn Reporter>, metrics: &ReporterMetrics) -> Self {
        Self {
            inner,
            jaeger: metrics.for_format("jaeger"),
            zipkin: metrics.for_format("zipkin"),
        }
    }

    async fn observe<F>(
        metrics: &FormatReporterMetrics,
        span_count: usize,
        submit: F,
    ) -> Result<(), SubmitError>
    where
        F: std::future::Future<Output = Result<(), SubmitError>>,
    {
        let started = Instant::now();
        let result = submit.await;
        metrics
            .submit_latency
            .observe(started.elapsed().as_secs_f64());
        match &result {
            Ok(()) => {
                metrics.batches_submitted.inc();
                metrics.spans_submitted.inc_by(span_count as u64);
                metrics.batch_size.set(span_count as i64);
            }
            Err(err) => {
                metrics.batches_failures.inc();
                metrics.spans_failures.inc_by(span_count as u64);
                tracing::error!(error = %err, spans = span_count, "batch submission failed");
            }
        }
        result
    }
}

#[async_trait]
impl Reporter for MetricsReporter {
    async fn emit_batch(&self, batch: &jaeger::Batch) -> Result<(), SubmitError> {
        Self::observe(&self.jaeger, batch.spans.len(), self.inner.emit_batch(batch)).await
    }

    async fn emit_zipkin_batch(&self, spans: &[zipkin::Span]) -> Result<(), SubmitError> {
        Self::observe(&self.zipkin, spans.len(), self.inner.emit_zipkin_batch(spans)).await
    }
}

/// Decorator republishing the tracer-side counters embedded in batches.
/// Counts are cumulative per client instance, so the last seen totals are
/// kept per `client-uuid` and only the delta is added.
pub struct ClientMetricsReporter {
    inner: Arc<dyn Reporter>,
    metrics: ClientStatsMetrics,
    last_seen: Mutex<HashMap<String, jaeger::ClientStats>>,
}

impl ClientMetricsReporter {
    pub fn new(inner: Arc<dyn Reporter>, metrics: ClientStatsMetrics) -> Self {
        Self {
            inner,
            metrics,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    fn record(&self, batch: &jaeger::Batch) {
        let Some(stats) = &batch.stats else {
            return;
        };
        self.metrics.batches_received.inc();
        let client_id = batch
            .process
            .tags
            .iter()
            .find(|tag| tag.key == CLIENT_UUID_TAG_KEY)
            .and_then(|tag| tag.v_str.clone())
            .unwrap_or_default();

        let mut last_seen = self.last_seen.lock().expect("client stats lock poisoned");
        let previous = last_seen.insert(client_id, *stats).unwrap_or_default();
        let delta = |new: i64, old: i64| (new - old).max(0) as u64;
        self.metrics
            .full_queue_dropped_spans
            .inc_by(delta(stats.full_queue_dropped_spans, previous.full_queue_dropped_spans));
        self.metrics
            .too_large_dropped_spans
            .inc_by(delta(stats.too_large_dropped_spans, previous.too_large_dropped_spans));
        self.metrics
            .failed_to_emit_spans
            .inc_by(delta(stats.failed_to_emit_spans, previous.failed_to_emit_spans));
    }
}

#[async_trait]
impl Reporter for ClientMetricsReporter {
    async fn emit_batch(&self, batch: &jaeger::Batch) -> Result<(), SubmitError> {
        self.record(batch);
        self.inner.emit_batch(batch).await
    }

    async fn emit_zipkin_batch(&self, spans: &[zipkin::Span]) -> Result<(), SubmitError> {
        self.inner.emit_zipkin_batch(spans).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct OkReporter;

    #[async_trait]
    impl Reporter for OkReporter {
        async fn emit_batch(&self, _batch: &jaeger::Batch) -> Result<(), SubmitError> {
            Ok(())
        }
        async fn emit_zipkin_batch(&self, _spans: &[zipkin::Span]) -> Result<(), SubmitError> {
            Ok(())
        }
    }

    struct FailReporter;

    #[async_trait]
    impl Reporter for FailReporter {
        async fn emit_batch(&self, _batch: &jaeger::Batch) -> Result<(), SubmitError> {
            Err(SubmitError::Transport("down".to_string()))
        }
        async fn emit_zipkin_batch(&self, _spans: &[zipkin::Span]) -> Result<(), SubmitError> {
            Err(SubmitError::Transport("down".to_string()))
        }
    }

    fn batch_with_stats(client_id: &str, failed: i64) -> jaeger::Batch {
        let mut process = jaeger::Process::new("svc");
        process
            .tags
            .push(jaeger::Tag::string(CLIENT_UUID_TAG_KEY, client_id));
        jaeger::Batch {
            process,
            spans: vec![jaeger::Span::default(), jaeger::Span::default()],
            seq_no: Some(1),
            stats: Some(jaeger::ClientStats {
                full_queue_dropped_spans: 0,
                too_large_dropped_spans: 0,
                failed_to_emit_spans: failed,
            }),
        }
    }

    #[tokio::test]
    async fn success_and_failure_counters() {
        let registry = prometheus::Registry::new();
        let metrics = ReporterMetrics::new(&registry).unwrap();
        let handles = metrics.for_format("jaeger");

        let ok = MetricsReporter::new(Arc::new(OkReporter), &metrics);
        ok.emit_batch(&batch_with_stats("c", 0)).await.unwrap();
        assert_eq!(handles.batches_submitted.get(), 1);
        assert_eq!(handles.spans_submitted.get(), 2);
        assert_eq!(handles.batch_size.get(), 2);
        assert_eq!(handles.batches_failures.get(), 0);

        let failing = MetricsReporter::new(Arc::new(FailReporter), &metrics);
        failing
            .emit_batch(&batch_with_stats("c", 0))
            .await
            .unwrap_err();
        assert_eq!(handles.batches_failures.get(), 1);
        assert_eq!(handles.spans_failures.get(), 2);
    }

    #[tokio::test]
    async fn client_stats_are_republished_as_deltas() {
        let registry = prometheus::Registry::new();
        let metrics = ClientStatsMetrics::new(&registry).unwrap();
        let reporter = ClientMetricsReporter::new(Arc::new(OkReporter), metrics.clone());

        reporter.emit_batch(&batch_with_stats("c1", 3)).await.unwrap();
        // Same cumulative total again: no new drops.
        reporter.emit_batch(&batch_with_stats("c1", 3)).await.unwrap();
        reporter.emit_batch(&batch_with_stats("c1", 5)).await.unwrap();
        // A second client contributes its own counts.
        reporter.emit_batch(&batch_with_stats("c2", 1)).await.unwrap();

        assert_eq!(metrics.failed_to_emit_spans.get(), 6);
        assert_eq!(metrics.batches_received.get(), 4);
    }
}
