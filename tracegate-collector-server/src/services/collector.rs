use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracegate_collector::metrics::FormatIngestMetrics;
use tracegate_collector::processor::SpanProcessor;
use tracegate_collector::sanitizer::Sanitizer;
use tracegate_model::{Batch, Span};
use tracegate_proto::convert;
use tracegate_proto::jaeger::api_v2::collector_service_server::CollectorService;
use tracegate_proto::jaeger::api_v2::{PostSpansRequest, PostSpansResponse};

/// Shared ingest pipeline: sanitize every span, hand the batch to the span
/// processor, keep the counters honest. One instance per transport so the
/// format label stays accurate.
pub struct SpanIngest {
    sanitizer: Arc<dyn Sanitizer>,
    processor: Arc<dyn SpanProcessor>,
    metrics: FormatIngestMetrics,
}

impl SpanIngest {
    pub fn new(
        sanitizer: Arc<dyn Sanitizer>,
        processor: Arc<dyn SpanProcessor>,
        metrics: FormatIngestMetrics,
    ) -> Self {
        Self {
            sanitizer,
            processor,
            metrics,
        }
    }

    pub async fn ingest(&self, batch: Batch) -> Result<usize, Status> {
        self.metrics.batches_received.inc();
        self.metrics.spans_received.inc_by(batch.spans.len() as u64);

        let process = batch.process;
        let spans: Vec<Span> = batch
            .spans
            .into_iter()
            .map(|mut span| {
                // Spans travelling inside a batch inherit the batch process
                // before sanitizing, so the per-span rules see the service
                // name when one exists.
                if span.process.is_none() && !process.service_name.is_empty() {
                    span.process = Some(process.clone());
                }
                self.sanitizer.sanitize(span)
            })
            .collect();
        let span_count = spans.len();

        self.processor
            .process(Batch {
                process,
                spans,
                seq_no: batch.seq_no,
                stats: batch.stats,
            })
            .await
            .map_err(|err| {
                self.metrics.spans_rejected.inc_by(span_count as u64);
                tracing::error!(error = %err, "span processor rejected batch");
                Status::internal("failed to process spans")
            })?;
        self.metrics.spans_saved.inc_by(span_count as u64);
        Ok(span_count)
    }
}

/// gRPC ingest handler over the shared pipeline.
pub struct CollectorGrpcService {
    ingest: Arc<SpanIngest>,
}

impl CollectorGrpcService {
    pub fn new(ingest: Arc<SpanIngest>) -> Self {
        Self { ingest }
    }
}

#[async_trait::async_trait]
impl CollectorService for CollectorGrpcService {
    async fn post_spans(
        &self,
        request: Request<PostSpansRequest>,
    ) -> Result<Response<PostSpansResponse>, Status> {
        let inner = request.into_inner();
        let batch = inner
            .batch
            .ok_or_else(|| Status::invalid_argument("batch is required"))?;
        let batch = convert::batch_to_domain(batch).map_err(|err| {
            tracing::error!(error = %err, "failed to decode batch");
            Status::invalid_argument("malformed batch")
        })?;
        self.ingest.ingest(batch).await?;
        Ok(Response::new(PostSpansResponse { ok: true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tracegate_collector::metrics::IngestMetrics;
    use tracegate_collector::processor::ProcessError;
    use tracegate_collector::sanitizer;
    use tracegate_proto::jaeger::api_v2 as proto;

    #[derive(Default)]
    pub(crate) struct RecordingProcessor {
        pub batches: Mutex<Vec<Batch>>,
        pub fail: bool,
    }

    #[async_trait::async_trait]
    impl SpanProcessor for RecordingProcessor {
        async fn process(&self, batch: Batch) -> Result<(), ProcessError> {
            if self.fail {
                return Err(ProcessError::Failed("storage down".to_string()));
            }
            self.batches.lock().unwrap().push(batch);
            Ok(())
        }
    }

    fn grpc_service(
        processor: Arc<RecordingProcessor>,
    ) -> (CollectorGrpcService, FormatIngestMetrics) {
        let registry = prometheus::Registry::new();
        let metrics = IngestMetrics::new(&registry).unwrap().for_format("grpc");
        let ingest = Arc::new(SpanIngest::new(
            sanitizer::standard_chain(HashMap::new()),
            processor,
            metrics.clone(),
        ));
        (CollectorGrpcService::new(ingest), metrics)
    }

    fn request(spans: usize) -> Request<PostSpansRequest> {
        Request::new(PostSpansRequest {
            batch: Some(proto::Batch {
                process: Some(proto::Process {
                    service_name: b"svc".to_vec(),
                    tags: vec![],
                }),
                spans: (0..spans)
                    .map(|_| proto::Span {
                        trace_id: vec![0; 16],
                        span_id: vec![0; 8],
                        operation_name: b"op".to_vec(),
                        ..Default::default()
                    })
                    .collect(),
            }),
        })
    }

    #[tokio::test]
    async fn sanitizes_and_forwards_batches() {
        let processor = Arc::new(RecordingProcessor::default());
        let (service, metrics) = grpc_service(processor.clone());

        let response = service.post_spans(request(2)).await.unwrap();
        assert!(response.into_inner().ok);

        let batches = processor.batches.lock().unwrap();
        assert_eq!(batches[0].spans.len(), 2);
        assert_eq!(
            batches[0].spans[0].process.as_ref().unwrap().service_name,
            "svc"
        );
        assert_eq!(metrics.batches_received.get(), 1);
        assert_eq!(metrics.spans_saved.get(), 2);
    }

    #[tokio::test]
    async fn missing_process_gets_the_null_placeholder() {
        let processor = Arc::new(RecordingProcessor::default());
        let (service, _) = grpc_service(processor.clone());

        let request = Request::new(PostSpansRequest {
            batch: Some(proto::Batch {
                process: None,
                spans: vec![proto::Span {
                    trace_id: vec![0; 16],
                    span_id: vec![0; 8],
                    operation_name: b"op".to_vec(),
                    ..Default::default()
                }],
            }),
        });
        service.post_spans(request).await.unwrap();

        let batches = processor.batches.lock().unwrap();
        assert_eq!(
            batches[0].spans[0].process.as_ref().unwrap().service_name,
            "null-process-and-service-name"
        );
    }

    #[tokio::test]
    async fn invalid_utf8_names_are_sanitized_not_rejected() {
        let processor = Arc::new(RecordingProcessor::default());
        let (service, metrics) = grpc_service(processor.clone());

        let request = Request::new(PostSpansRequest {
            batch: Some(proto::Batch {
                process: Some(proto::Process {
                    service_name: vec![0x73, 0x76, 0x63, 0xff],
                    tags: vec![],
                }),
                spans: vec![proto::Span {
                    trace_id: vec![0; 16],
                    span_id: vec![0; 8],
                    operation_name: vec![0x6f, 0x70, 0xfe],
                    ..Default::default()
                }],
            }),
        });
        let response = service.post_spans(request).await.unwrap();
        assert!(response.into_inner().ok);

        let batches = processor.batches.lock().unwrap();
        let span = &batches[0].spans[0];
        assert_eq!(span.operation_name, sanitizer::INVALID_OPERATION_NAME);
        assert_eq!(
            span.process.as_ref().unwrap().service_name,
            sanitizer::INVALID_SERVICE_NAME
        );
        assert_eq!(metrics.spans_saved.get(), 1);
    }

    #[tokio::test]
    async fn processor_failure_is_internal_and_counted() {
        let processor = Arc::new(RecordingProcessor {
            fail: true,
            ..Default::default()
        });
        let (service, metrics) = grpc_service(processor);

        let status = service.post_spans(request(1)).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::Internal);
        assert_eq!(metrics.spans_rejected.get(), 1);
        assert_eq!(metrics.spans_saved.get(), 0);
    }

    #[tokio::test]
    async fn missing_batch_is_invalid_argument() {
        let processor = Arc::new(RecordingProcessor::default());
        let (service, _) = grpc_service(processor);
        let status = service
            .post_spans(Request::new(PostSpansRequest { batch: None }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }
}
