use super::{Reporter, SubmitError};
use async_trait::async_trait;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tracegate_proto::convert as proto_convert;
use tracegate_proto::jaeger::api_v2::collector_service_client::CollectorServiceClient;
use tracegate_proto::jaeger::api_v2::PostSpansRequest;
use tracegate_thrift::{convert, jaeger, zipkin};

/// Submits batches over one long-lived gRPC channel; the channel
/// multiplexes all in-flight submissions and reconnects on its own.
pub struct GrpcReporter {
    channel: Channel,
    report_timeout: Duration,
}

impl GrpcReporter {
    /// Dials lazily: an unreachable collector surfaces per-submission, not
    /// at startup.
    pub fn dial(endpoint: &str, report_timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{endpoint}")
        };
        let channel = Endpoint::from_shared(endpoint)?.connect_lazy();
        Ok(Self::new(channel, report_timeout))
    }

    pub fn new(channel: Channel, report_timeout: Duration) -> Self {
        Self {
            channel,
            report_timeout,
        }
    }

    async fn post(&self, batch: tracegate_model::Batch) -> Result<(), SubmitError> {
        let proto_batch = proto_convert::batch_to_proto(&batch);
        let mut client = CollectorServiceClient::new(self.channel.clone());
        let mut request = tonic::Request::new(PostSpansRequest {
            batch: Some(proto_batch),
        });
        request.set_timeout(self.report_timeout);
        client
            .post_spans(request)
            .await
            .map_err(|status| SubmitError::Transport(status.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Reporter for GrpcReporter {
    async fn emit_batch(&self, batch: &jaeger::Batch) -> Result<(), SubmitError> {
        let domain = convert::batch_to_domain(batch.clone())
            .map_err(|err| SubmitError::Serialize(err.to_string()))?;
        self.post(domain).await
    }

    async fn emit_zipkin_batch(&self, spans: &[zipkin::Span]) -> Result<(), SubmitError> {
        let batches = convert::zipkin_to_domain(spans.to_vec())
            .map_err(|err| SubmitError::Serialize(err.to_string()))?;
        for batch in batches {
            self.post(batch).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use tracegate_proto::jaeger::api_v2::collector_service_server::{
        CollectorService, CollectorServiceServer,
    };
    use tracegate_proto::jaeger::api_v2::{Batch, PostSpansResponse};

    #[derive(Default)]
    struct RecordingCollector {
        batches: Mutex<Vec<Batch>>,
        fail: bool,
    }

    #[async_trait]
    impl CollectorService for RecordingCollector {
        async fn post_spans(
            &self,
            request: tonic::Request<PostSpansRequest>,
        ) -> Result<tonic::Response<PostSpansResponse>, tonic::Status> {
            if self.fail {
                return Err(tonic::Status::internal("storage down"));
            }
            if let Some(batch) = request.into_inner().batch {
                self.batches.lock().unwrap().push(batch);
            }
            Ok(tonic::Response::new(PostSpansResponse { ok: true }))
        }
    }

    async fn start_collector(collector: std::sync::Arc<RecordingCollector>) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            tonic::transport::Server::builder()
                .add_service(CollectorServiceServer::from_arc(collector))
                .serve_with_incoming(tokio_stream_wrapper(listener))
                .await
                .unwrap();
        });
        addr
    }

    fn tokio_stream_wrapper(
        listener: tokio::net::TcpListener,
    ) -> impl futures::Stream<Item = Result<tokio::net::TcpStream, std::io::Error>> {
        futures::stream::unfold(listener, |listener| async move {
            let item = listener.accept().await.map(|(stream, _)| stream);
            Some((item, listener))
        })
    }

    fn sample_batch() -> jaeger::Batch {
        jaeger::Batch::new(
            jaeger::Process::new("svc"),
            vec![jaeger::Span {
                trace_id_low: 1,
                span_id: 2,
                operation_name: "span1".to_string(),
                start_time: 100,
                duration: 10,
                ..Default::default()
            }],
        )
    }

    #[tokio::test]
    async fn submits_batches_over_grpc() {
        let collector = std::sync::Arc::new(RecordingCollector::default());
        let addr = start_collector(collector.clone()).await;
        let reporter =
            GrpcReporter::dial(&addr.to_string(), Duration::from_secs(1)).unwrap();

        reporter.emit_batch(&sample_batch()).await.unwrap();

        let batches = collector.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].spans[0].operation_name, b"span1");
        assert_eq!(
            batches[0].process.as_ref().unwrap().service_name,
            b"svc"
        );
    }

    #[tokio::test]
    async fn collector_error_is_a_transport_failure() {
        let collector = std::sync::Arc::new(RecordingCollector {
            fail: true,
            ..Default::default()
        });
        let addr = start_collector(collector).await;
        let reporter =
            GrpcReporter::dial(&addr.to_string(), Duration::from_secs(1)).unwrap();

        let err = reporter.emit_batch(&sample_batch()).await.unwrap_err();
        assert!(matches!(err, SubmitError::Transport(_)));
    }
}
