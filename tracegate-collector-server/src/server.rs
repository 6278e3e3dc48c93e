use crate::services::{route_thrift_ingest, CollectorGrpcService, SamplingGrpcService, SpanIngest};
use crate::settings::Settings;
use anyhow::Context;
use std::sync::Arc;
use tracegate_collector::metrics::IngestMetrics;
use tracegate_collector::processor::{LoggingSpanProcessor, SpanProcessor};
use tracegate_collector::sanitizer;
use tracegate_collector::strategy::StrategyStore;
use tracegate_launcher::{HttpRouter, LaunchSettings, Metrics};
use tracegate_proto::jaeger::api_v2::collector_service_server::CollectorServiceServer;
use tracegate_proto::jaeger::api_v2::sampling_manager_server::SamplingManagerServer;

const SERVICE_NAME: &str = "tracegate_collector";

#[derive(Clone)]
struct Router {
    http_ingest: Arc<SpanIngest>,
}

impl Router {
    fn grpc_router(
        &self,
        grpc_ingest: Arc<SpanIngest>,
        store: Arc<StrategyStore>,
    ) -> tonic::transport::server::Router {
        tonic::transport::Server::builder()
            .add_service(CollectorServiceServer::new(CollectorGrpcService::new(
                grpc_ingest,
            )))
            .add_service(SamplingManagerServer::new(SamplingGrpcService::new(store)))
    }
}

impl HttpRouter for Router {
    fn register_routes(&self, service_config: &mut actix_web::web::ServiceConfig) {
        route_thrift_ingest(service_config, Arc::clone(&self.http_ingest));
    }
}

pub async fn run(settings: Settings) -> Result<(), anyhow::Error> {
    let metrics = Metrics::new(SERVICE_NAME, &settings.metrics.route);

    let store = Arc::new(match &settings.sampling_strategies_file {
        Some(path) => StrategyStore::from_file(path)
            .with_context(|| format!("failed to load strategies from {}", path.display()))?,
        None => StrategyStore::with_default(),
    });

    let sanitizer = sanitizer::standard_chain(settings.service_aliases.clone());
    let processor: Arc<dyn SpanProcessor> = Arc::new(LoggingSpanProcessor);
    let ingest_metrics = IngestMetrics::new(metrics.registry())?;

    let grpc_ingest = Arc::new(SpanIngest::new(
        Arc::clone(&sanitizer),
        processor.clone(),
        ingest_metrics.for_format("grpc"),
    ));
    let http_ingest = Arc::new(SpanIngest::new(
        sanitizer,
        processor,
        ingest_metrics.for_format("http"),
    ));

    let router = Router { http_ingest };
    let grpc_router = router.grpc_router(grpc_ingest, store);

    let launch_settings = LaunchSettings {
        service_name: SERVICE_NAME.to_string(),
        server: settings.server,
        metrics: settings.metrics,
    };

    tracegate_launcher::launch(&launch_settings, Some(metrics), router, Some(grpc_router)).await
}
