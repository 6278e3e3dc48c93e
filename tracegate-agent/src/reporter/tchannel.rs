use super::{Reporter, SubmitError};
use crate::tchannel::Pool;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracegate_thrift::{calls, jaeger, zipkin};

/// Submits batches over the framed TCP transport, optionally peer-managed.
/// Each submission carries its own TTL and never propagates the agent's own
/// tracing context (the call frames carry a zeroed tracing block).
pub struct TchannelReporter {
    pool: Arc<Pool>,
    service_name: String,
    report_timeout: Duration,
}

impl TchannelReporter {
    pub fn new(pool: Arc<Pool>, service_name: impl Into<String>, report_timeout: Duration) -> Self {
        Self {
            pool,
            service_name: service_name.into(),
            report_timeout,
        }
    }

    pub fn pool(&self) -> Arc<Pool> {
        Arc::clone(&self.pool)
    }
}

#[async_trait]
impl Reporter for TchannelReporter {
    async fn emit_batch(&self, batch: &jaeger::Batch) -> Result<(), SubmitError> {
        let arg3 = calls::encode_submit_batches_args(std::slice::from_ref(batch))
            .map_err(|err| SubmitError::Serialize(err.to_string()))?;
        let response = self
            .pool
            .call(
                &self.service_name,
                calls::SUBMIT_BATCHES,
                arg3.into(),
                self.report_timeout,
            )
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        let responses = calls::decode_submit_batches_result(&response)
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        if responses.iter().any(|r| !r.ok) {
            return Err(SubmitError::Rejected(
                "collector reported a failed batch".to_string(),
            ));
        }
        Ok(())
    }

    async fn emit_zipkin_batch(&self, spans: &[zipkin::Span]) -> Result<(), SubmitError> {
        let arg3 = calls::encode_submit_zipkin_batch_args(spans)
            .map_err(|err| SubmitError::Serialize(err.to_string()))?;
        let response = self
            .pool
            .call(
                &self.service_name,
                calls::SUBMIT_ZIPKIN_BATCH,
                arg3.into(),
                self.report_timeout,
            )
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        let responses = calls::decode_submit_zipkin_batch_result(&response)
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        if responses.iter().any(|r| !r.ok) {
            return Err(SubmitError::Rejected(
                "collector reported a failed span".to_string(),
            ));
        }
        Ok(())
    }
}
