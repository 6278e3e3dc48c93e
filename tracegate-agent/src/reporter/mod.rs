//! Reporters submit span batches to the collector. All transports share one
//! trait; decorators stack as metrics → client-metrics → multi → transport.

pub mod grpc;
pub mod http;
pub mod metrics;
pub mod multi;
pub mod tchannel;

pub use grpc::GrpcReporter;
pub use http::{HttpAuth, HttpReporter};
pub use metrics::{ClientMetricsReporter, MetricsReporter};
pub use multi::MultiReporter;
pub use tchannel::TchannelReporter;

use async_trait::async_trait;
use std::fmt;
use tracegate_thrift::{jaeger, zipkin};

/// Submission failure. Per-batch failures are counted and surfaced to the
/// caller; they never abort the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("collector returned status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to serialize batch: {0}")]
    Serialize(String),
    #[error("collector rejected submission: {0}")]
    Rejected(String),
    #[error(transparent)]
    Multi(#[from] MultiError),
}

/// Error list returned by the fan-out reporter: exactly the failures, in
/// reporter order, with successes omitted.
#[derive(Debug)]
pub struct MultiError {
    pub errors: Vec<SubmitError>,
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} reporter(s) failed: ", self.errors.len())?;
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

#[async_trait]
pub trait Reporter: Send + Sync {
    async fn emit_batch(&self, batch: &jaeger::Batch) -> Result<(), SubmitError>;
    async fn emit_zipkin_batch(&self, spans: &[zipkin::Span]) -> Result<(), SubmitError>;
}
