use super::{MultiError, Reporter, SubmitError};
use async_trait::async_trait;
use std::sync::Arc;
use tracegate_thrift::{jaeger, zipkin};

/// Fans a submission out to every reporter in order and wraps the failures
/// into one error; successes are omitted from the wrap.
pub struct MultiReporter {
    reporters: Vec<Arc<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new(reporters: Vec<Arc<dyn Reporter>>) -> Self {
        Self { reporters }
    }
}

#[async_trait]
impl Reporter for MultiReporter {
    async fn emit_batch(&self, batch: &jaeger::Batch) -> Result<(), SubmitError> {
        let mut errors = Vec::new();
        for reporter in &self.reporters {
            if let Err(err) = reporter.emit_batch(batch).await {
                errors.push(err);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(MultiError { errors }.into())
        }
    }

    async fn emit_zipkin_batch(&self, spans: &[zipkin::Span]) -> Result<(), SubmitError> {
        let mut errors = Vec::new();
        for reporter in &self.reporters {
            if let Err(err) = reporter.emit_zipkin_batch(spans).await {
                errors.push(err);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(MultiError { errors }.into())
        }
    }
}
