use async_trait::async_trait;
use tracegate_model::Batch;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("span processing failed: {0}")]
    Failed(String),
}

/// Seam between the ingest edge and whatever consumes spans. Storage
/// engines live behind this trait and are out of scope here; the default
/// processor logs and drops.
#[async_trait]
pub trait SpanProcessor: Send + Sync {
    async fn process(&self, batch: Batch) -> Result<(), ProcessError>;
}

/// Accepts everything and logs at debug. Useful as the tail of the
/// pipeline when no storage is wired.
pub struct LoggingSpanProcessor;

#[async_trait]
impl SpanProcessor for LoggingSpanProcessor {
    async fn process(&self, batch: Batch) -> Result<(), ProcessError> {
        tracing::debug!(
            service = batch.process.service_name,
            spans = batch.spans.len(),
            "processed batch"
        );
        Ok(())
    }
}
